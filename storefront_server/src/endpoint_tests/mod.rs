//! HTTP-level tests, run against the full route tree over a file-store backend in a scratch directory.

mod helpers;

mod auth;
mod orders;
mod webhooks;
