//! Application orchestration for the bridge.
//!
//! Manages channel setup, the startup command sequence, the stream workers,
//! the control server, and graceful shutdown.

use crate::analyzer::AnalyzerDescriptor;
use crate::config::AppConfig;
use crate::error::{Error, Result};
use crate::link::{channels, ChannelSet, CommandLink};
use crate::osc::{ControlServer, TelemetrySender};
use crate::protocol::Command;
use crate::session::{Session, TuningState};
use crate::streaming::{AnalysesStreamWorker, DataStreamWorker};
use log::{debug, error, info};
use signal_hook::consts::{SIGINT, SIGTERM};
use signal_hook::iterator::Signals;
use std::net::{Shutdown, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Main application: owns the channel set, the session, and the workers.
pub struct BridgeApp {
    config: AppConfig,
    session: Arc<Session>,
    /// Stream sockets, handed to their workers at start.
    data_stream: Option<TcpStream>,
    analyses_stream: Option<TcpStream>,
    /// Cloned handles used to close every channel at shutdown.
    channel_handles: Vec<TcpStream>,
    shutdown: Arc<AtomicBool>,
    workers: Vec<JoinHandle<()>>,
}

impl BridgeApp {
    /// Connect and handshake the four-channel set, then assemble the session.
    pub fn new(config: AppConfig) -> Result<Self> {
        info!(
            "connecting to acquisition server at {}",
            config.acquisition.host
        );
        let mut channel_set =
            ChannelSet::connect(&config.acquisition.host, &config.acquisition.ports)?;
        channels::handshake(&mut channel_set.command)?;

        let channel_handles = channel_set.shutdown_handles()?;
        let ChannelSet {
            command,
            response,
            data,
            analyses,
        } = channel_set;

        let telemetry = TelemetrySender::new(&config.osc.telemetry_addr)?;
        info!("sending telemetry via OSC to {}", config.osc.telemetry_addr);

        let tuning = TuningState {
            selection: Vec::new(),
            left: AnalyzerDescriptor::foot_cycle(
                "foot_cycle_left",
                &config.analyzer,
                config.analyzer.left_channel,
                config.analyzer.left_threshold,
            ),
            right: AnalyzerDescriptor::foot_cycle(
                "foot_cycle_right",
                &config.analyzer,
                config.analyzer.right_channel,
                config.analyzer.right_threshold,
            ),
        };

        let session = Arc::new(Session::new(
            CommandLink::new(command, response),
            tuning,
            telemetry,
            config.telemetry.data_multiplier,
            config.telemetry.dedup_window,
        ));

        Ok(Self {
            config,
            session,
            data_stream: Some(data),
            analyses_stream: Some(analyses),
            channel_handles,
            shutdown: Arc::new(AtomicBool::new(false)),
            workers: Vec::new(),
        })
    }

    /// Run the startup sequence, then block until an interrupt arrives.
    pub fn run(&mut self) -> Result<()> {
        if let Err(e) = self.startup() {
            self.stop_workers();
            return Err(e);
        }

        info!("bridge running, press Ctrl+C to stop");
        while !self.shutdown.load(Ordering::Relaxed) {
            thread::sleep(Duration::from_millis(100));
        }

        info!("shutting down...");
        self.stop_workers();
        Ok(())
    }

    /// Startup sequence: mode select, stream workers, initial analyzer,
    /// control server, signal handler. Order matters: the data worker must
    /// be draining its socket before the analyzer starts producing.
    fn startup(&mut self) -> Result<()> {
        if !self.session.link.lock().send_command(Command::ConnectEmg) {
            return Err(Error::Protocol(
                "CONNECT_EMG command rejected".to_string(),
            ));
        }

        self.start_data_worker()?;
        self.register_initial_analyzer()?;
        self.start_analyses_worker()?;
        self.start_control_server()?;
        self.setup_signal_handler();
        Ok(())
    }

    /// Register the initial analyzer configuration on the server.
    fn register_initial_analyzer(&self) -> Result<()> {
        let descriptor = self.session.tuning.lock().left.clone();
        let mut link = self.session.link.lock();
        if !link.send_command(Command::AddAnalyzer) {
            return Err(Error::Protocol("ADD_ANALYZER command rejected".to_string()));
        }
        if !link.send_extra_data(&descriptor) {
            return Err(Error::Protocol(
                "initial analyzer configuration rejected".to_string(),
            ));
        }
        info!("✓ analyzer {} registered", descriptor.name);
        Ok(())
    }

    fn start_data_worker(&mut self) -> Result<()> {
        let stream = self
            .data_stream
            .take()
            .ok_or_else(|| Error::Connection("data channel already taken".to_string()))?;
        let session = Arc::clone(&self.session);
        let shutdown = Arc::clone(&self.shutdown);

        let handle = thread::Builder::new()
            .name("data-stream".to_string())
            .spawn(move || DataStreamWorker::new(stream, session, shutdown).run())?;
        self.workers.push(handle);
        info!("✓ data stream worker started");
        Ok(())
    }

    fn start_analyses_worker(&mut self) -> Result<()> {
        let stream = self
            .analyses_stream
            .take()
            .ok_or_else(|| Error::Connection("analyses channel already taken".to_string()))?;
        let session = Arc::clone(&self.session);
        let shutdown = Arc::clone(&self.shutdown);

        let handle = thread::Builder::new()
            .name("analyses-stream".to_string())
            .spawn(move || AnalysesStreamWorker::new(stream, session, shutdown).run())?;
        self.workers.push(handle);
        info!("✓ analyses stream worker started");
        Ok(())
    }

    fn start_control_server(&mut self) -> Result<()> {
        let mut server = ControlServer::bind(
            &self.config.osc.control_bind,
            Arc::clone(&self.session),
            Arc::clone(&self.shutdown),
        )?;
        info!(
            "✓ control server listening on {}",
            self.config.osc.control_bind
        );

        let handle = thread::Builder::new()
            .name("osc-control".to_string())
            .spawn(move || server.run())?;
        self.workers.push(handle);
        Ok(())
    }

    /// Setup signal handler for graceful shutdown
    fn setup_signal_handler(&self) {
        let shutdown = Arc::clone(&self.shutdown);

        thread::Builder::new()
            .name("signal-handler".to_string())
            .spawn(move || {
                let mut signals =
                    Signals::new([SIGINT, SIGTERM]).expect("Failed to register signal handlers");

                if let Some(sig) = signals.forever().next() {
                    info!("received signal {:?}, initiating shutdown...", sig);
                    shutdown.store(true, Ordering::Relaxed);
                }
            })
            .expect("Failed to spawn signal handler thread");
    }

    /// Close every channel and join the workers.
    ///
    /// Closing the sockets is what unblocks workers stuck in blocking reads;
    /// the control server observes the flag on its next receive timeout.
    fn stop_workers(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);

        for handle in &self.channel_handles {
            let _ = handle.shutdown(Shutdown::Both);
        }

        for worker in self.workers.drain(..) {
            let name = worker.thread().name().unwrap_or("worker").to_string();
            if worker.join().is_err() {
                error!("{} worker panicked", name);
            } else {
                debug!("{} worker joined", name);
            }
        }

        info!("connections closed");
    }
}

impl Drop for BridgeApp {
    fn drop(&mut self) {
        if !self.workers.is_empty() {
            debug!("BridgeApp cleaning up...");
            self.stop_workers();
        }
    }
}
