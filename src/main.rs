//! # Voxel Physics Entry Point
//!
//! Runs the headless engine demo.
//!
//! ## Usage
//!
//! ```bash
//! RUST_LOG=info VOXEL_CONFIG=config.json cargo run --release
//! ```

fn main() {
    voxel_physics::run();
}
