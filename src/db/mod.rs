//! MongoDB persistence layer

mod country_store;
pub mod mongo;
pub mod schemas;

pub use country_store::CountryStore;
pub use mongo::MongoClient;
