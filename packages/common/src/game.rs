use serde::{Deserialize, Serialize};

/// Battle.net game type as declared by the client.
///
/// Encodes ranked/casual as well as standard/wild. Numeric values follow
/// the game server's own enum so client-declared integers map directly.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(
    feature = "sea-orm",
    derive(sea_orm::DeriveActiveEnum, sea_orm::EnumIter),
    sea_orm(rs_type = "i32", db_type = "Integer")
)]
#[serde(try_from = "i32", into = "i32")]
pub enum BnetGameType {
    #[cfg_attr(feature = "sea-orm", sea_orm(num_value = 0))]
    Unknown,
    #[cfg_attr(feature = "sea-orm", sea_orm(num_value = 1))]
    Friends,
    #[cfg_attr(feature = "sea-orm", sea_orm(num_value = 2))]
    RankedStandard,
    #[cfg_attr(feature = "sea-orm", sea_orm(num_value = 3))]
    Arena,
    #[cfg_attr(feature = "sea-orm", sea_orm(num_value = 4))]
    VsAi,
    #[cfg_attr(feature = "sea-orm", sea_orm(num_value = 5))]
    Tutorial,
    #[cfg_attr(feature = "sea-orm", sea_orm(num_value = 6))]
    Async,
    #[cfg_attr(feature = "sea-orm", sea_orm(num_value = 7))]
    CasualStandard,
    #[cfg_attr(feature = "sea-orm", sea_orm(num_value = 16))]
    TavernBrawlPvp,
    #[cfg_attr(feature = "sea-orm", sea_orm(num_value = 17))]
    TavernBrawl1pVersusAi,
    #[cfg_attr(feature = "sea-orm", sea_orm(num_value = 18))]
    TavernBrawl2pCoop,
    #[cfg_attr(feature = "sea-orm", sea_orm(num_value = 30))]
    RankedWild,
    #[cfg_attr(feature = "sea-orm", sea_orm(num_value = 31))]
    CasualWild,
}

impl BnetGameType {
    pub fn is_tavern_brawl(&self) -> bool {
        matches!(
            self,
            Self::TavernBrawlPvp | Self::TavernBrawl1pVersusAi | Self::TavernBrawl2pCoop
        )
    }

    pub fn is_ranked(&self) -> bool {
        matches!(self, Self::RankedStandard | Self::RankedWild)
    }
}

impl Default for BnetGameType {
    fn default() -> Self {
        Self::Unknown
    }
}

impl From<BnetGameType> for i32 {
    fn from(value: BnetGameType) -> Self {
        match value {
            BnetGameType::Unknown => 0,
            BnetGameType::Friends => 1,
            BnetGameType::RankedStandard => 2,
            BnetGameType::Arena => 3,
            BnetGameType::VsAi => 4,
            BnetGameType::Tutorial => 5,
            BnetGameType::Async => 6,
            BnetGameType::CasualStandard => 7,
            BnetGameType::TavernBrawlPvp => 16,
            BnetGameType::TavernBrawl1pVersusAi => 17,
            BnetGameType::TavernBrawl2pCoop => 18,
            BnetGameType::RankedWild => 30,
            BnetGameType::CasualWild => 31,
        }
    }
}

impl TryFrom<i32> for BnetGameType {
    type Error = String;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Unknown),
            1 => Ok(Self::Friends),
            2 => Ok(Self::RankedStandard),
            3 => Ok(Self::Arena),
            4 => Ok(Self::VsAi),
            5 => Ok(Self::Tutorial),
            6 => Ok(Self::Async),
            7 => Ok(Self::CasualStandard),
            16 => Ok(Self::TavernBrawlPvp),
            17 => Ok(Self::TavernBrawl1pVersusAi),
            18 => Ok(Self::TavernBrawl2pCoop),
            30 => Ok(Self::RankedWild),
            31 => Ok(Self::CasualWild),
            other => Err(format!("unknown game type value {other}")),
        }
    }
}

/// Final play-state of a player as reported by the game log.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(
    feature = "sea-orm",
    derive(sea_orm::DeriveActiveEnum, sea_orm::EnumIter),
    sea_orm(rs_type = "i32", db_type = "Integer")
)]
#[serde(try_from = "i32", into = "i32")]
pub enum PlayState {
    #[cfg_attr(feature = "sea-orm", sea_orm(num_value = 0))]
    Invalid,
    #[cfg_attr(feature = "sea-orm", sea_orm(num_value = 1))]
    Playing,
    #[cfg_attr(feature = "sea-orm", sea_orm(num_value = 2))]
    Winning,
    #[cfg_attr(feature = "sea-orm", sea_orm(num_value = 3))]
    Losing,
    #[cfg_attr(feature = "sea-orm", sea_orm(num_value = 4))]
    Won,
    #[cfg_attr(feature = "sea-orm", sea_orm(num_value = 5))]
    Lost,
    #[cfg_attr(feature = "sea-orm", sea_orm(num_value = 6))]
    Tied,
    #[cfg_attr(feature = "sea-orm", sea_orm(num_value = 7))]
    Disconnected,
    #[cfg_attr(feature = "sea-orm", sea_orm(num_value = 8))]
    Conceded,
}

impl PlayState {
    /// True when the state indicates the player won the match.
    pub fn is_won(&self) -> bool {
        matches!(self, Self::Winning | Self::Won)
    }

    /// True when the log ended with the game still in progress, which
    /// means the recording client dropped mid-game.
    pub fn is_abnormal(&self) -> bool {
        matches!(self, Self::Playing | Self::Invalid)
    }
}

impl Default for PlayState {
    fn default() -> Self {
        Self::Invalid
    }
}

impl From<PlayState> for i32 {
    fn from(value: PlayState) -> Self {
        value as i32
    }
}

impl TryFrom<i32> for PlayState {
    type Error = String;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Invalid),
            1 => Ok(Self::Playing),
            2 => Ok(Self::Winning),
            3 => Ok(Self::Losing),
            4 => Ok(Self::Won),
            5 => Ok(Self::Lost),
            6 => Ok(Self::Tied),
            7 => Ok(Self::Disconnected),
            8 => Ok(Self::Conceded),
            other => Err(format!("unknown play state value {other}")),
        }
    }
}
