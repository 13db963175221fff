mod client;

pub use client::TimelineClient;
