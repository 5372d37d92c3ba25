//! Contains subcommands for the kona node.

mod info;
pub use info::InfoCommand;

mod node;
pub use node::NodeCommand;

mod bootstore;
pub use bootstore::BootstoreCommand;

mod net;
pub use net::NetCommand;

mod registry;
pub use registry::RegistryCommand;
