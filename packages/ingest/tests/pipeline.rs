use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use sea_orm::{
    ColumnTrait, ConnectOptions, Database, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, TransactionTrait,
};
use tempfile::TempDir;

use common::game_tree::{GameTree, HandEntity, JsonLogParser, ParsedLog, ParsedPlayer};
use common::meta::UploadMeta;
use common::storage::BlobStore;
use common::storage::filesystem::FilesystemBlobStore;
use common::{BnetGameType, PlayState, UploadEventStatus, UploadEventType};

use ingest::config::{AppConfig, DatabaseConfig, MqAppConfig, ProcessingConfig, StorageConfig};
use ingest::consumers::handle_upload_event;
use ingest::entity::{
    deck, game_replay, global_game, global_game_player, pending_replay_claim, upload_event,
};
use ingest::state::AppState;
use ingest::uploads::{NewUploadEvent, create_upload_event, delete_replay};
use ingest::{claims, identity, seed, stuck};

struct TestApp {
    state: AppState,
    _blob_dir: TempDir,
}

impl TestApp {
    async fn spawn() -> Self {
        let mut opt = ConnectOptions::new("sqlite::memory:");
        opt.max_connections(1).sqlx_logging(false);
        let db = Database::connect(opt).await.expect("connect sqlite");
        db.get_schema_registry("ingest::entity::*")
            .sync(&db)
            .await
            .expect("sync schema");
        seed::ensure_indexes(&db).await.expect("ensure indexes");

        let blob_dir = tempfile::tempdir().expect("tempdir");
        let storage = Arc::new(
            FilesystemBlobStore::new(blob_dir.path().join("blobs"), 10 * 1024 * 1024)
                .await
                .expect("blob store"),
        );

        let config = AppConfig {
            database: DatabaseConfig {
                url: "sqlite::memory:".into(),
            },
            mq: MqAppConfig {
                enabled: false,
                ..Default::default()
            },
            storage: StorageConfig::default(),
            processing: ProcessingConfig::default(),
        };

        let state = AppState {
            db,
            mq: None,
            storage,
            parser: Arc::new(JsonLogParser),
            config,
        };

        Self {
            state,
            _blob_dir: blob_dir,
        }
    }

    fn db(&self) -> &DatabaseConnection {
        &self.state.db
    }

    /// Accept an upload and run the consumer's handler on it, as the
    /// queue would.
    async fn upload_and_process(
        &self,
        token_key: Option<&str>,
        meta: UploadMeta,
        log: &ParsedLog,
    ) -> upload_event::Model {
        let record = self.upload(token_key, meta, log).await;
        handle_upload_event(&self.state, record.id)
            .await
            .expect("handle upload event");
        self.reload_upload(record.id).await
    }

    async fn upload(
        &self,
        token_key: Option<&str>,
        meta: UploadMeta,
        log: &ParsedLog,
    ) -> upload_event::Model {
        if let Some(key) = token_key {
            identity::get_or_create_token(self.db(), key)
                .await
                .expect("create token");
        }
        create_upload_event(
            &self.state,
            NewUploadEvent {
                token_key: token_key.map(String::from),
                upload_type: UploadEventType::PowerLog,
                upload_ip: "203.0.113.10".into(),
                meta,
                raw_log: serde_json::to_vec(log).unwrap(),
            },
        )
        .await
        .expect("create upload event")
    }

    async fn reload_upload(&self, id: i64) -> upload_event::Model {
        upload_event::Entity::find_by_id(id)
            .one(self.db())
            .await
            .unwrap()
            .unwrap()
    }

    async fn count<E: EntityTrait>(&self) -> u64
    where
        E::Model: FromQueryResult,
    {
        E::find().count(self.db()).await.unwrap()
    }
}

fn match_start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2016, 5, 10, 17, 10, 6).unwrap()
}

/// Metadata for the canonical two-player ladder game used throughout.
fn base_meta(start: DateTime<Utc>) -> UploadMeta {
    let mut meta = UploadMeta::new(start);
    meta.hearthstone_build = Some(12574);
    meta.game_type = Some(BnetGameType::CasualStandard);
    meta.game_id = Some(11927693);
    meta.server_ip = Some("12.130.246.55".into());
    meta.server_port = Some(3724);
    meta.client_id = Some(4);
    meta
}

fn parsed_player(player_id: i16, final_state: PlayState, hidden_hand: bool) -> ParsedPlayer {
    let hand = if hidden_hand {
        vec![
            HandEntity {
                entity_id: 60 + player_id as i32,
                card_id: None,
            },
            HandEntity {
                entity_id: 70 + player_id as i32,
                card_id: Some("CS2_023".into()),
            },
        ]
    } else {
        vec![HandEntity {
            entity_id: 70 + player_id as i32,
            card_id: Some("EX1_001".into()),
        }]
    };

    ParsedPlayer {
        player_id,
        name: Some(format!("Player{player_id}#1{player_id}23")),
        account_hi: 144115193835963207,
        account_lo: 1000000 + player_id as i64,
        is_ai: false,
        is_first: player_id == 1,
        hero_card_id: Some(if player_id == 1 { "HERO_01" } else { "HERO_08" }.into()),
        hero_premium: player_id == 2,
        final_state,
        initial_deck_card_ids: vec!["CS2_023".into(), "CS2_025".into(), "EX1_001".into()],
        hand,
    }
}

/// A log where player 1 is the hidden-hand (friendly) side and wins.
fn two_player_log(start: DateTime<Utc>) -> ParsedLog {
    ParsedLog {
        games: vec![GameTree {
            start_time: start,
            end_time: start + Duration::minutes(14),
            num_turns: 17,
            entity_ids: (1..=68).collect(),
            players: vec![
                parsed_player(1, PlayState::Won, true),
                parsed_player(2, PlayState::Lost, false),
            ],
        }],
    }
}

mod end_to_end {
    use super::*;

    #[tokio::test]
    async fn successful_upload_builds_one_of_everything() {
        let app = TestApp::spawn().await;
        let record = app
            .upload_and_process(Some("tok-e2e"), base_meta(match_start()), &two_player_log(match_start()))
            .await;

        assert_eq!(record.status, UploadEventStatus::Success);
        assert!(record.game_id.is_some());
        assert!(record.error_message.is_none());

        assert_eq!(app.count::<global_game::Entity>().await, 1);
        assert_eq!(app.count::<game_replay::Entity>().await, 1);
        assert_eq!(app.count::<global_game_player::Entity>().await, 2);

        let game = global_game::Entity::find().one(app.db()).await.unwrap().unwrap();
        assert_eq!(game.hearthstone_build, Some(12574));
        assert_eq!(game.game_type, BnetGameType::CasualStandard);
        assert_eq!(game.game_server_game_id, Some(11927693));
        assert_eq!(game.game_server_address.as_deref(), Some("12.130.246.55"));
        assert_eq!(game.game_server_port, Some(3724));
        assert_eq!(game.num_turns, 17);
        assert_eq!(game.num_entities, 68);
        // May 2016 is the 29th month since January 2014.
        assert_eq!(game.ladder_season, Some(29));

        let replay = game_replay::Entity::find().one(app.db()).await.unwrap().unwrap();
        assert_eq!(record.game_id, Some(replay.id));
        assert_eq!(replay.friendly_player_id, 1);
        assert_eq!(replay.won, Some(true));
        assert!(!replay.disconnected);
        assert_eq!(replay.upload_token_id.as_deref(), Some("tok-e2e"));

        // The generated document is in the blob store.
        let key = replay.replay_document_key.clone().unwrap();
        let bytes = app.state.storage.get(&key).await.unwrap();
        let doc: ingest::document::ReplayDocument = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(doc.friendly_player_id, 1);
        assert_eq!(doc.players.len(), 2);
    }

    #[tokio::test]
    async fn player_rows_carry_declared_metadata() {
        let app = TestApp::spawn().await;
        let mut meta = base_meta(match_start());
        meta.player1.rank = Some(18);
        meta.player1.stars = Some(3);
        meta.player2.legend_rank = Some(204);

        app.upload_and_process(Some("tok-meta"), meta, &two_player_log(match_start()))
            .await;

        let players = global_game_player::Entity::find()
            .all(app.db())
            .await
            .unwrap();
        let p1 = players.iter().find(|p| p.player_id == 1).unwrap();
        let p2 = players.iter().find(|p| p.player_id == 2).unwrap();
        assert_eq!(p1.rank, Some(18));
        assert_eq!(p1.stars, Some(3));
        assert_eq!(p2.legend_rank, Some(204));
        assert!(p1.is_first);
        assert!(!p2.is_first);
        assert_eq!(p2.hero_card_id, "HERO_08");
        assert!(p2.hero_premium);
        assert_eq!(p1.final_state, PlayState::Won);
        assert_eq!(p2.final_state, PlayState::Lost);
    }

    #[tokio::test]
    async fn disconnected_when_friendly_side_still_playing() {
        let app = TestApp::spawn().await;
        let mut log = two_player_log(match_start());
        log.games[0].players[0].final_state = PlayState::Playing;

        let record = app
            .upload_and_process(Some("tok-dc"), base_meta(match_start()), &log)
            .await;
        assert_eq!(record.status, UploadEventStatus::Success);

        let replay = game_replay::Entity::find().one(app.db()).await.unwrap().unwrap();
        assert!(replay.disconnected);
        assert_eq!(replay.won, None);
    }

    #[tokio::test]
    async fn tie_counts_as_loss_for_the_uploader() {
        let app = TestApp::spawn().await;
        let mut log = two_player_log(match_start());
        log.games[0].players[0].final_state = PlayState::Tied;
        log.games[0].players[1].final_state = PlayState::Tied;

        app.upload_and_process(Some("tok-tie"), base_meta(match_start()), &log)
            .await;

        let replay = game_replay::Entity::find().one(app.db()).await.unwrap().unwrap();
        assert_eq!(replay.won, Some(false));
        assert!(!replay.disconnected);
    }
}

mod failure_mapping {
    use super::*;

    #[tokio::test]
    async fn unparseable_log_maps_to_parsing_error() {
        let app = TestApp::spawn().await;
        let record = app.upload(Some("tok-bad"), base_meta(match_start()), &two_player_log(match_start())).await;

        // Corrupt the stored blob so the parser fails.
        app.state
            .storage
            .put(&record.file_key, b"GameState.DebugPrintPower() - CREATE_GAME")
            .await
            .unwrap();

        handle_upload_event(&app.state, record.id).await.unwrap();
        let record = app.reload_upload(record.id).await;
        assert_eq!(record.status, UploadEventStatus::ParsingError);
        assert!(record.error_message.is_some());
        assert_eq!(app.count::<game_replay::Entity>().await, 0);
    }

    #[tokio::test]
    async fn multi_game_log_maps_to_parsing_error() {
        let app = TestApp::spawn().await;
        let mut log = two_player_log(match_start());
        log.games.push(log.games[0].clone());

        let record = app
            .upload_and_process(Some("tok-two"), base_meta(match_start()), &log)
            .await;
        assert_eq!(record.status, UploadEventStatus::ParsingError);
        assert!(record.error_message.unwrap().contains("Expected exactly 1 game"));
    }

    #[tokio::test]
    async fn ambiguous_friendly_player_maps_to_unsupported() {
        let app = TestApp::spawn().await;
        let mut log = two_player_log(match_start());
        // Reveal every card: no hidden hand on either side.
        log.games[0].players[0].hand = vec![HandEntity {
            entity_id: 61,
            card_id: Some("CS2_023".into()),
        }];

        let record = app
            .upload_and_process(Some("tok-amb"), base_meta(match_start()), &log)
            .await;
        assert_eq!(record.status, UploadEventStatus::Unsupported);
        assert_eq!(app.count::<game_replay::Entity>().await, 0);
    }

    #[tokio::test]
    async fn declared_friendly_player_overrides_ambiguity() {
        let app = TestApp::spawn().await;
        let mut log = two_player_log(match_start());
        log.games[0].players[0].hand = vec![];

        let mut meta = base_meta(match_start());
        meta.friendly_player = Some(2);

        let record = app.upload_and_process(Some("tok-decl"), meta, &log).await;
        assert_eq!(record.status, UploadEventStatus::Success);

        let replay = game_replay::Entity::find().one(app.db()).await.unwrap().unwrap();
        assert_eq!(replay.friendly_player_id, 2);
        // Player 2 lost, so the uploader lost.
        assert_eq!(replay.won, Some(false));
    }

    #[tokio::test]
    async fn missing_player_name_maps_to_unsupported() {
        let app = TestApp::spawn().await;
        let mut log = two_player_log(match_start());
        log.games[0].players[1].name = None;

        let record = app
            .upload_and_process(Some("tok-name"), base_meta(match_start()), &log)
            .await;
        assert_eq!(record.status, UploadEventStatus::Unsupported);
        assert!(record.error_message.unwrap().contains("no resolvable name"));
    }

    #[tokio::test]
    async fn message_for_missing_record_is_an_error() {
        let app = TestApp::spawn().await;
        let result = handle_upload_event(&app.state, 424242).await;
        assert!(result.is_err());
    }
}

mod deduplication {
    use super::*;

    #[tokio::test]
    async fn second_pov_within_window_unifies() {
        let app = TestApp::spawn().await;
        let start = match_start();

        app.upload_and_process(Some("tok-a"), base_meta(start), &two_player_log(start))
            .await;

        // The opponent uploads the same match: same server tuple,
        // different client, clock drifted by an hour.
        let mut meta_b = base_meta(start + Duration::hours(1));
        meta_b.client_id = Some(9);
        let record_b = app
            .upload_and_process(
                Some("tok-b"),
                meta_b,
                &two_player_log(start + Duration::hours(1)),
            )
            .await;

        assert_eq!(record_b.status, UploadEventStatus::Success);
        assert_eq!(app.count::<global_game::Entity>().await, 1);
        assert_eq!(app.count::<game_replay::Entity>().await, 2);
        // Player rows are created only by the first sighting.
        assert_eq!(app.count::<global_game_player::Entity>().await, 2);
    }

    #[tokio::test]
    async fn outside_window_creates_a_second_game() {
        let app = TestApp::spawn().await;
        let start = match_start();

        app.upload_and_process(Some("tok-a"), base_meta(start), &two_player_log(start))
            .await;

        let drifted = start + Duration::hours(13);
        let mut meta_b = base_meta(drifted);
        meta_b.client_id = Some(9);
        app.upload_and_process(Some("tok-b"), meta_b, &two_player_log(drifted))
            .await;

        assert_eq!(app.count::<global_game::Entity>().await, 2);
        assert_eq!(app.count::<global_game_player::Entity>().await, 4);
    }

    #[tokio::test]
    async fn differing_server_tuple_never_unifies() {
        let app = TestApp::spawn().await;
        let start = match_start();

        app.upload_and_process(Some("tok-a"), base_meta(start), &two_player_log(start))
            .await;

        let mut meta_b = base_meta(start);
        meta_b.client_id = Some(9);
        meta_b.game_id = Some(11927694);
        app.upload_and_process(Some("tok-b"), meta_b, &two_player_log(start))
            .await;

        assert_eq!(app.count::<global_game::Entity>().await, 2);
    }

    #[tokio::test]
    async fn ineligible_uploads_always_create_new_games() {
        let app = TestApp::spawn().await;
        let start = match_start();

        let mut meta = base_meta(start);
        meta.client_id = None;

        app.upload_and_process(Some("tok-a"), meta.clone(), &two_player_log(start))
            .await;
        app.upload_and_process(Some("tok-b"), meta, &two_player_log(start))
            .await;

        assert_eq!(app.count::<global_game::Entity>().await, 2);
    }

    #[tokio::test]
    async fn same_vantage_point_short_circuits_to_existing_replay() {
        let app = TestApp::spawn().await;
        let start = match_start();

        let record_a = app
            .upload_and_process(Some("tok-a"), base_meta(start), &two_player_log(start))
            .await;

        // Same client uploads the same match again under the same
        // credential (e.g. a retried client).
        let record_b = app
            .upload_and_process(Some("tok-a"), base_meta(start), &two_player_log(start))
            .await;

        assert_eq!(record_b.status, UploadEventStatus::Success);
        assert_eq!(record_a.game_id, record_b.game_id);
        assert_eq!(app.count::<game_replay::Entity>().await, 1);
        assert_eq!(app.count::<global_game::Entity>().await, 1);
    }

    #[tokio::test]
    async fn duplicate_credential_guard_holds_across_vantage_points() {
        let app = TestApp::spawn().await;
        let start = match_start();

        app.upload_and_process(Some("tok-a"), base_meta(start), &two_player_log(start))
            .await;

        // Same credential, same match, but a different client id, so
        // the POV short-circuit does not fire. The (credential, game)
        // guard must still hold.
        let mut meta_b = base_meta(start);
        meta_b.client_id = Some(9);
        let record_b = app
            .upload_and_process(Some("tok-a"), meta_b, &two_player_log(start))
            .await;

        assert_eq!(record_b.status, UploadEventStatus::Success);
        assert_eq!(app.count::<game_replay::Entity>().await, 1);
    }
}

mod idempotency {
    use super::*;

    #[tokio::test]
    async fn redelivered_message_mutates_nothing() {
        let app = TestApp::spawn().await;
        let record = app
            .upload_and_process(Some("tok-once"), base_meta(match_start()), &two_player_log(match_start()))
            .await;
        let replay_before = game_replay::Entity::find().one(app.db()).await.unwrap().unwrap();

        // The queue redelivers the same message.
        handle_upload_event(&app.state, record.id).await.unwrap();

        assert_eq!(app.count::<global_game::Entity>().await, 1);
        assert_eq!(app.count::<game_replay::Entity>().await, 1);
        assert_eq!(app.count::<global_game_player::Entity>().await, 2);

        let record_after = app.reload_upload(record.id).await;
        assert_eq!(record_after.status, UploadEventStatus::Success);
        assert_eq!(record_after.game_id, Some(replay_before.id));

        let replay_after = game_replay::Entity::find().one(app.db()).await.unwrap().unwrap();
        assert_eq!(replay_after, replay_before);
    }

    #[tokio::test]
    async fn deck_resolution_is_idempotent_across_permutations() {
        let app = TestApp::spawn().await;

        let cards: Vec<String> = vec!["EX1_001".into(), "CS2_023".into(), "CS2_023".into()];
        let mut reversed = cards.clone();
        reversed.reverse();

        let first = ingest::builder::resolve_deck(app.db(), &cards).await.unwrap();
        let second = ingest::builder::resolve_deck(app.db(), &reversed).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(app.count::<deck::Entity>().await, 1);
    }

    #[tokio::test]
    async fn identical_decks_across_uploads_share_one_row() {
        let app = TestApp::spawn().await;
        let start = match_start();

        app.upload_and_process(Some("tok-a"), base_meta(start), &two_player_log(start))
            .await;

        // Both players in the fixture use the same observed card list,
        // so one upload already shares a single deck row.
        assert_eq!(app.count::<deck::Entity>().await, 1);
    }
}

mod ownership {
    use super::*;

    #[tokio::test]
    async fn anonymous_credential_leaves_a_pending_claim() {
        let app = TestApp::spawn().await;
        app.upload_and_process(Some("tok-claim"), base_meta(match_start()), &two_player_log(match_start()))
            .await;

        let claim = pending_replay_claim::Entity::find()
            .one(app.db())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(claim.token_id, "tok-claim");

        let replay = game_replay::Entity::find().one(app.db()).await.unwrap().unwrap();
        assert_eq!(replay.user_id, None);
        assert_eq!(claim.replay_id, replay.id);
    }

    #[tokio::test]
    async fn binding_transfers_every_claim_and_deletes_them() {
        let app = TestApp::spawn().await;
        let start = match_start();

        app.upload_and_process(Some("tok-bind"), base_meta(start), &two_player_log(start))
            .await;

        let mut meta_b = base_meta(start + Duration::hours(20));
        meta_b.game_id = Some(11927700);
        app.upload_and_process(
            Some("tok-bind"),
            meta_b,
            &two_player_log(start + Duration::hours(20)),
        )
        .await;

        assert_eq!(app.count::<pending_replay_claim::Entity>().await, 2);

        let transferred = claims::bind_token_to_user(app.db(), "tok-bind", 77)
            .await
            .unwrap();
        assert_eq!(transferred, 2);
        assert_eq!(app.count::<pending_replay_claim::Entity>().await, 0);

        for replay in game_replay::Entity::find().all(app.db()).await.unwrap() {
            assert_eq!(replay.user_id, Some(77));
        }
    }

    #[tokio::test]
    async fn transfer_is_all_or_nothing() {
        let app = TestApp::spawn().await;
        app.upload_and_process(Some("tok-atomic"), base_meta(match_start()), &two_player_log(match_start()))
            .await;

        // Simulate a failure mid-transfer: run the transfer in a
        // transaction that never commits.
        let txn = app.db().begin().await.unwrap();
        let transferred = claims::transfer_claims(&txn, "tok-atomic", 99).await.unwrap();
        assert_eq!(transferred, 1);
        txn.rollback().await.unwrap();

        // Nothing moved: the claim is intact and the replay unowned.
        assert_eq!(app.count::<pending_replay_claim::Entity>().await, 1);
        let replay = game_replay::Entity::find().one(app.db()).await.unwrap().unwrap();
        assert_eq!(replay.user_id, None);
    }

    #[tokio::test]
    async fn bound_credential_attributes_immediately_without_claims() {
        let app = TestApp::spawn().await;
        identity::get_or_create_token(app.db(), "tok-owned").await.unwrap();
        claims::bind_token_to_user(app.db(), "tok-owned", 12).await.unwrap();

        app.upload_and_process(Some("tok-owned"), base_meta(match_start()), &two_player_log(match_start()))
            .await;

        let replay = game_replay::Entity::find().one(app.db()).await.unwrap().unwrap();
        assert_eq!(replay.user_id, Some(12));
        assert_eq!(app.count::<pending_replay_claim::Entity>().await, 0);
    }

    #[tokio::test]
    async fn identity_provider_tracks_bindings() {
        use ingest::identity::{DbIdentityProvider, IdentityProvider};

        let app = TestApp::spawn().await;
        identity::get_or_create_token(app.db(), "tok-id").await.unwrap();

        let provider = DbIdentityProvider::new(app.db().clone());
        assert_eq!(provider.resolve("tok-id").await.unwrap(), None);
        assert_eq!(provider.resolve("tok-never-issued").await.unwrap(), None);

        claims::bind_token_to_user(app.db(), "tok-id", 5).await.unwrap();
        assert_eq!(provider.resolve("tok-id").await.unwrap(), Some(5));
    }

    #[tokio::test]
    async fn sweep_resolves_claims_left_behind() {
        let app = TestApp::spawn().await;
        app.upload_and_process(Some("tok-sweep"), base_meta(match_start()), &two_player_log(match_start()))
            .await;

        // Bind the token out-of-band, without the claim hook.
        let token = ingest::entity::auth_token::Entity::find_by_id("tok-sweep")
            .one(app.db())
            .await
            .unwrap()
            .unwrap();
        let mut active: ingest::entity::auth_token::ActiveModel = token.into();
        active.user_id = sea_orm::Set(Some(31));
        sea_orm::ActiveModelTrait::update(active, app.db()).await.unwrap();

        let swept = claims::sweep_unclaimed(app.db()).await.unwrap();
        assert_eq!(swept, 1);
        let replay = game_replay::Entity::find().one(app.db()).await.unwrap().unwrap();
        assert_eq!(replay.user_id, Some(31));
    }
}

mod lifecycle {
    use super::*;

    #[tokio::test]
    async fn stuck_processing_records_are_failed_by_the_detector() {
        let app = TestApp::spawn().await;
        let record = app.upload(Some("tok-stuck"), base_meta(match_start()), &two_player_log(match_start())).await;

        // Simulate a worker that died an hour into processing.
        let mut active: upload_event::ActiveModel = record.clone().into();
        active.status = sea_orm::Set(UploadEventStatus::Processing);
        active.processing_started_at = sea_orm::Set(Some(Utc::now() - Duration::hours(1)));
        sea_orm::ActiveModelTrait::update(active, app.db()).await.unwrap();

        let config = ProcessingConfig {
            stuck_timeout_secs: 1800,
            ..Default::default()
        };
        let failed = stuck::detect_and_fail_stuck_uploads(app.db(), &config).await.unwrap();
        assert_eq!(failed, 1);

        let record = app.reload_upload(record.id).await;
        assert_eq!(record.status, UploadEventStatus::ServerError);
        assert!(record.error_message.unwrap().contains("Stuck in Processing"));
    }

    #[tokio::test]
    async fn fresh_processing_records_are_left_alone() {
        let app = TestApp::spawn().await;
        let record = app.upload(Some("tok-fresh"), base_meta(match_start()), &two_player_log(match_start())).await;

        let mut active: upload_event::ActiveModel = record.clone().into();
        active.status = sea_orm::Set(UploadEventStatus::Processing);
        active.processing_started_at = sea_orm::Set(Some(Utc::now()));
        sea_orm::ActiveModelTrait::update(active, app.db()).await.unwrap();

        let config = ProcessingConfig::default();
        let failed = stuck::detect_and_fail_stuck_uploads(app.db(), &config).await.unwrap();
        assert_eq!(failed, 0);

        let record = app.reload_upload(record.id).await;
        assert_eq!(record.status, UploadEventStatus::Processing);
    }

    #[tokio::test]
    async fn deleting_the_last_replay_cascades_to_the_global_game() {
        let app = TestApp::spawn().await;
        app.upload_and_process(Some("tok-del"), base_meta(match_start()), &two_player_log(match_start()))
            .await;

        let replay = game_replay::Entity::find().one(app.db()).await.unwrap().unwrap();
        let doc_key = replay.replay_document_key.clone().unwrap();
        assert!(app.state.storage.exists(&doc_key).await.unwrap());

        delete_replay(&app.state, replay.shortid).await.unwrap();

        assert_eq!(app.count::<game_replay::Entity>().await, 0);
        assert_eq!(app.count::<global_game::Entity>().await, 0);
        assert_eq!(app.count::<global_game_player::Entity>().await, 0);
        assert_eq!(app.count::<pending_replay_claim::Entity>().await, 0);
        assert!(!app.state.storage.exists(&doc_key).await.unwrap());
    }

    #[tokio::test]
    async fn deleting_one_of_two_replays_keeps_the_global_game() {
        let app = TestApp::spawn().await;
        let start = match_start();

        app.upload_and_process(Some("tok-a"), base_meta(start), &two_player_log(start))
            .await;
        let mut meta_b = base_meta(start);
        meta_b.client_id = Some(9);
        app.upload_and_process(Some("tok-b"), meta_b, &two_player_log(start))
            .await;

        let victim = game_replay::Entity::find()
            .filter(game_replay::Column::UploadTokenId.eq("tok-b"))
            .one(app.db())
            .await
            .unwrap()
            .unwrap();
        delete_replay(&app.state, victim.shortid).await.unwrap();

        assert_eq!(app.count::<game_replay::Entity>().await, 1);
        assert_eq!(app.count::<global_game::Entity>().await, 1);
        assert_eq!(app.count::<global_game_player::Entity>().await, 2);
    }
}
