#![deny(missing_docs)]
#![doc = "Core statuses, parameters and value types shared by the PWA engine crates."]

pub mod errors;
pub mod parameter;
pub mod report;
pub mod rng;
pub mod status;
pub mod value;

pub use errors::{ErrorInfo, PwaError};
pub use parameter::{ParameterId, ParameterStore, ParameterValue};
pub use report::{ConsistencyReport, Finding};
pub use rng::{derive_substream_seed, RngHandle};
pub use status::{combine_variable_status, CalculationStatus, Status, VariableStatus};
pub use value::{Complex64, FourVector};
