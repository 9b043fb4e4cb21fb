//! Transaction submission module with sequence handling and gas selection

mod builder;
mod clock;
mod gas;
mod sequence;
mod sender;

pub use builder::{
    build_envelope, string_arg, EntryFunction, ModuleId, RawTransaction, SignedTransaction,
};
pub use clock::{Clock, FixedClock, SystemClock};
pub use gas::{GasBudget, GasEstimator};
pub use sequence::SequenceManager;
pub use sender::SubmissionWorkflow;
