pub mod domain {
    pub mod error;
    pub mod model {
        pub mod book;
        pub mod catalog;
    }
    pub mod repository;
}

pub mod application {
    pub mod error;
    pub mod service;
}

pub mod infra {
    pub mod json_store;
}

pub mod interface {
    pub mod cli;
    pub mod templates;
    pub mod terminal;
    pub mod web;
}
