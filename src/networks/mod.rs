//! Network controllers: contexts driven by transformers and transitions.

mod animation;
mod manager;
mod multi_layout;
mod node_link;

pub use animation::Animation;
pub use manager::NetworkManager;
pub use multi_layout::{MultiLayoutNetwork, MAIN_NETWORK_ID};
pub use node_link::{NodeLinkNetwork, TransformerSet};
