mod activity;
mod bot;
mod client;
mod members;
mod settings;

pub use client::DashboardClient;
