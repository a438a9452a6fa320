//! Data model (design §3): player identity, roster, placement, minute
//! ledger, plan, pending rotation, game configuration, setup payload and
//! persisted snapshot.

pub mod ledger;
pub mod placement;
pub mod player;
pub mod plan;
pub mod roster;
pub mod setup;
pub mod snapshot;

pub use ledger::{MinuteLedger, PlayerLedger};
pub use placement::Placement;
pub use player::{PlayerId, PlayerMeta};
pub use plan::{PendingRotation, Plan, Reason, RotationEvent};
pub use roster::Roster;
pub use setup::{GameSetup, InitializeResult};
pub use snapshot::GameSnapshot;
