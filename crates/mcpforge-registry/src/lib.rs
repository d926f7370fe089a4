//! The capability registry (tools/resources/prompts) and argument coercion
//! that sit between the router and application-supplied handler thunks.

pub mod coercion;
pub mod descriptor;
pub mod registry;

pub use coercion::enrich;
pub use descriptor::{
    ParameterDescriptor, PromptDescriptor, PromptThunk, RawArguments, ResourceDescriptor,
    ResourceThunk, ToolDescriptor, ToolThunk,
};
pub use registry::{CapabilityRegistry, RegistryError};
