// Adapters layer: concrete implementations of the domain ports for external systems.
// Storage backends live with their configuration under `config::cli` and `config::lambda`.

pub mod narrative;

pub use narrative::ChatNarrator;
