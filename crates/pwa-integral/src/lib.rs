#![deny(missing_docs)]
#![doc = "Partition-parallel Monte-Carlo integrals over decay-tree models."]

pub mod element;
pub mod model_integral;
pub mod sampler;
pub mod tree_integral;

pub use element::{Averageable, IntegralElement};
pub use model_integral::{
    ComponentIntegral, ComponentReport, IntegralReport, ModelIntegral, TreeReport,
};
pub use sampler::{
    calculate_from_generator, calculate_partitions, GeneratorOpts, IntegrationOpts,
    IntegrationPass,
};
pub use tree_integral::TreeIntegral;
