//! # Rolodex
//!
//! A multi-tenant directory engine for AI-assisted products.
//!
//! Rolodex ingests CSV exports into accounts' named lists through per-type
//! field mappers and schema validation, serves exact, substring, and ranked
//! full-text search scoped to what each account owns, and generates tool
//! documentation so an LLM agent knows exactly which lists, tags, and fields
//! it can query.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌──────────────┐   ┌───────────┐
//! │ CSV exports │──▶│   Pipeline   │──▶│  SQLite   │
//! │  per list   │   │  Map+Check   │   │ FTS5+JSON │
//! └─────────────┘   └──────────────┘   └─────┬─────┘
//!                                            │
//!                        ┌───────────────────┤
//!                        ▼                   ▼
//!                   ┌──────────┐       ┌──────────┐
//!                   │   CLI    │       │   HTTP   │
//!                   │  (rdx)   │       │ (tools)  │
//!                   └──────────┘       └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! rdx init                                       # create database
//! rdx import providers.csv --account acme \
//!     --list physicians --entry-type provider    # seed a list
//! rdx search "chen" --account acme --lists physicians
//! rdx tool-docs --agent front-desk               # docs for an agent prompt
//! rdx serve                                      # start HTTP tool server
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`schema`] | Entry schemas and record validation |
//! | [`mapper`] | Field-mapper trait, raw rows, registry |
//! | [`mapper_provider`] | Builtin mapper for professional rosters |
//! | [`mapper_product`] | Builtin mapper for catalog exports |
//! | [`mapper_service`] | Builtin mapper for bookable offerings |
//! | [`import`] | CSV import pipeline and list reseeding |
//! | [`search`] | Tenant-scoped exact/substring/FTS search |
//! | [`tooldocs`] | Generated tool documentation for agents |
//! | [`tools`] | Tool trait, registry, and built-in tools |
//! | [`server`] | HTTP tool server |
//! | [`stats`] | Account and list overview |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |

pub mod config;
pub mod db;
pub mod import;
pub mod mapper;
pub mod mapper_product;
pub mod mapper_provider;
pub mod mapper_service;
pub mod migrate;
pub mod models;
pub mod schema;
pub mod search;
pub mod server;
pub mod stats;
pub mod tooldocs;
pub mod tools;
