pub mod auth_token;
pub mod deck;
pub mod game_replay;
pub mod global_game;
pub mod global_game_player;
pub mod pending_replay_claim;
pub mod upload_event;
