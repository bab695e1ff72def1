#![deny(missing_docs)]
#![doc = "Decay-tree models: assembly, locking, per-event seeding and incremental evaluation."]

pub mod component;
pub mod decay_tree;
pub mod frame_cache;
pub mod kahan;
pub mod model;
pub mod momenta;
pub mod shapes;

pub use component::{AmplitudeComponent, AmplitudeId, CalcStage, KinematicComponent};
pub use decay_tree::{CoherentSum, DecayTree, DecayTreeId};
pub use frame_cache::FrameCache;
pub use kahan::KahanSum;
pub use model::Model;
pub use momenta::MomentaAccessor;
pub use shapes::{ConstantWidthBreitWigner, FlatAmplitude};
