mod routes;

mod server;
pub use server::Server;

mod state_store;
pub use state_store::StateStore;
