pub mod http; // HTTP adapter (server, handlers, auth gate)
