#![doc = include_str!("../../../README.md")]

mod builtins;
mod context;
mod engine;
mod error;
mod host;
mod interp;
mod io;
mod lexer;
mod listener;
mod node;
mod parser;
mod property;
mod terms;
mod token;
mod value;

pub use crate::{
    engine::Engine,
    error::{CodeLoc, Exception, ExceptionKind},
    host::{HostBridge, HostClass, HostObject, HostValue},
    io::{CollectStringConsole, ConsoleLevel, ConsoleWriter, StdConsole},
    listener::{DeclKind, EngineListener, Event, EventKind, NoopListener, Recorded, RecordingListener, Recovery, StderrListener},
};
