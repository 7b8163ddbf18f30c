pub mod assets;
pub mod bem;
pub mod cli;
pub mod config;
pub mod context;
pub mod device;
pub mod engine;
pub mod error;
pub mod host;
pub mod locate;
pub mod make;
pub mod platform;
pub mod report;
pub mod resolve;
pub mod templates;

// Convenience re-exports
pub use bem::{Bem, BemOptions, BundleResolver, Format};
pub use config::{Config, Platform};
pub use context::RequestContext;
pub use device::{DeviceClassifier, KnownDevice, UserAgentClassifier};
pub use engine::{BemJson, Engines, Renderer, TreeBuilder};
pub use error::BemError;
pub use host::{Asset, Host, StaticHost};
pub use locate::{list_bundles, BundleLocator, LocateOptions, Located, LocatedIn};
pub use platform::select_platform;
pub use templates::{TemplateRenderer, TemplateTreeBuilder};
