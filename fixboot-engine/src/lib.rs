/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! # fixboot Engine
//!
//! Server-side FIX engine for the fixboot acceptor.
//!
//! This crate provides:
//! - **Application trait**: Callback interface for handling FIX messages
//! - **Strategies**: Log and message factories with stock implementations
//! - **Acceptors**: Single-threaded and multi-threaded socket acceptors
//! - **ConnectorManager**: Start/stop lifecycle with ordering phase
//! - **ManagementExporter**: In-process registry of running connectors
//! - **Builder API**: Fluent configuration for acceptor setup

pub mod acceptor;
pub mod application;
pub mod builder;
pub mod connector;
pub mod log;
pub mod management;
pub mod message_factory;

pub use acceptor::{
    Acceptor, AcceptorKind, AcceptorParts, SocketAcceptor, ThreadedSocketAcceptor, new_acceptor,
};
pub use application::{Application, ApplicationAdapter, RejectReason};
pub use builder::AcceptorBuilder;
pub use connector::{ConnectorManager, DEFAULT_PHASE, Lifecycle};
pub use log::{Log, LogFactory, ScreenLog, ScreenLogFactory};
pub use management::{ConnectorSnapshot, ManagementError, ManagementExporter, ObjectName};
pub use message_factory::{DefaultMessageFactory, MessageFactory};
