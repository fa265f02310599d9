pub mod collaborators;
pub mod collisions;
pub mod driving;
pub mod game;
pub mod headless;
pub mod hook;
pub mod interpolation;
pub mod offtrack;
pub mod session;
pub mod track;
pub mod world_state;
