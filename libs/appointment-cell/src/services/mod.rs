pub mod rendezvous;

pub use rendezvous::RendezvousService;
