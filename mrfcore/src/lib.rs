pub mod error;
pub mod config;
pub mod pipeline;

// dictionary module
pub mod dictionary;

// data module
pub mod data {
    pub mod quantity;
    pub mod image;
    pub mod maps;
    pub mod results;
}

// algorithm module
pub mod algorithm {
    pub mod normalize;
    pub mod matching;
    pub mod derive;
    pub mod statistics;
}
