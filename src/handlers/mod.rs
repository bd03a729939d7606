//! HTTP handlers

pub mod health;
pub mod auth;
pub mod properties;
pub mod tenants;
pub mod contracts;
pub mod payments;
pub mod maintenance;
pub mod documents;
pub mod notifications;
pub mod subscription;
pub mod reports;
pub mod admin;
