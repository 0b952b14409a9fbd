pub mod api_docs;

pub use api_docs::{
    EndpointDetail, EndpointSummary, ParameterInfo, ParameterLocation, PropertyInfo, SchemaInfo,
};
