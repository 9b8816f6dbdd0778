// handlers/mod.rs - Handler tiers
//
// Public (no auth) → Protected (JWT auth) → Dev (unauthenticated, development only)

pub mod public;    // / and /health
pub mod protected; // /api/*
pub mod dev;       // /dev
