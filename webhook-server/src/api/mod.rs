/*
 * Responsibility
 * - HTTP surface: route table + handlers
 */
pub mod handlers;
pub mod routes;
