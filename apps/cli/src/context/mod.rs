mod registry;

pub use registry::ServiceContext;
