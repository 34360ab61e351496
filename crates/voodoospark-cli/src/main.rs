//! Command-line interface for the VoodooSpark adaptor.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use voodoospark_core::{Adaptor, AdaptorConfig, DeviceEvent};
use voodoospark_devices::{
    pin_val, PinId, PinValue, SimulatedClient, SimulatedClientFactory, VoodooSpark,
};

/// VoodooSpark - drive the pins of a cloud-connected device.
#[derive(Parser, Debug)]
#[command(name = "voodoospark")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Action to perform.
    #[command(subcommand)]
    command: Command,

    /// Device identifier.
    #[arg(long, global = true, env = "SPARK_DEVICE_ID")]
    device_id: Option<String>,

    /// Cloud access token.
    #[arg(long, global = true, env = "SPARK_ACCESS_TOKEN", hide_env_values = true)]
    access_token: Option<String>,

    /// Cloud relay base URL.
    #[arg(long, global = true, env = "SPARK_API_URL")]
    api_url: Option<String>,

    /// Verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Use an in-memory device instead of the cloud relay.
    #[arg(long, global = true)]
    simulate: bool,
}

/// Available commands.
#[derive(Subcommand, Debug)]
enum Command {
    /// List the operations the adaptor exposes.
    Commands,
    /// Read a digital pin.
    DigitalRead {
        pin: PinId,
    },
    /// Write a digital pin (value sent as-is).
    DigitalWrite {
        pin: PinId,
        value: PinValue,
    },
    /// Read an analog pin.
    AnalogRead {
        pin: PinId,
    },
    /// Pulse-width write; level in 0.0..=1.0.
    AnalogWrite {
        pin: PinId,
        level: f64,
    },
    /// Pulse-width write; level in 0.0..=1.0.
    PwmWrite {
        pin: PinId,
        level: f64,
    },
    /// Servo write; level in 0.0..=1.0 maps to 0..=180 degrees.
    ServoWrite {
        pin: PinId,
        level: f64,
    },
    /// Print device events until Ctrl-C.
    Listen {
        /// Event names to subscribe to.
        #[arg(required = true)]
        names: Vec<String>,
    },
    /// Call a firmware function.
    Call {
        function: String,
        /// Arguments, joined with commas.
        args: Vec<String>,
    },
    /// Read a firmware variable.
    Variable {
        name: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    if let Command::Commands = args.command {
        for command in voodoospark_core::Command::ALL {
            let kind = if command.is_read() { "read" } else { "write" };
            println!("{:<14}{}", command.as_str(), kind);
        }
        return Ok(());
    }

    let spark = build_adaptor(&args)?;
    spark
        .connect()
        .await
        .with_context(|| format!("Failed to connect to device {}", spark.device_id()))?;

    let result = execute(&spark, args.command).await;
    spark.disconnect().await?;
    result
}

fn init_logging(verbose: bool) {
    let json_logging = std::env::var("VOODOOSPARK_LOG_JSON")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(false);

    let default_level = if verbose { "voodoospark=debug" } else { "voodoospark=info" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    // Results go to stdout; logs go to stderr.
    if json_logging {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .compact()
            .with_writer(std::io::stderr)
            .init();
    }
}

fn build_config(args: &Args) -> AdaptorConfig {
    let mut config = AdaptorConfig::from_env();
    if let Some(device_id) = &args.device_id {
        config.device_id = Some(device_id.clone());
    }
    if let Some(access_token) = &args.access_token {
        config.access_token = Some(access_token.clone());
    }
    if let Some(url) = &args.api_url {
        config = config.with_api_base_url(url.clone());
    }
    config
}

fn build_adaptor(args: &Args) -> Result<VoodooSpark> {
    let config = build_config(args);

    if args.simulate {
        let client = Arc::new(SimulatedClient::new(
            config.device_id.clone().unwrap_or_default(),
        ));
        client.register_function("fortyTwo", 42);
        let spark = VoodooSpark::new(config, Arc::new(SimulatedClientFactory::new(client)))?;
        tracing::debug!(device_id = %spark.device_id(), "using simulated device");
        return Ok(spark);
    }

    Ok(VoodooSpark::with_cloud(config)?)
}

async fn execute(spark: &VoodooSpark, command: Command) -> Result<()> {
    match command {
        Command::Commands => {}
        Command::DigitalRead { pin } => {
            let value = spark.digital_read(pin).await?;
            println!("{} ({})", value, pin_val(value.into()));
        }
        Command::DigitalWrite { pin, value } => {
            spark.digital_write(pin, value).await?;
            println!("ok");
        }
        Command::AnalogRead { pin } => {
            println!("{}", spark.analog_read(pin).await?);
        }
        Command::AnalogWrite { pin, level } => {
            spark.analog_write(pin, level).await?;
            println!("ok");
        }
        Command::PwmWrite { pin, level } => {
            spark.pwm_write(pin, level).await?;
            println!("ok");
        }
        Command::ServoWrite { pin, level } => {
            spark.servo_write(pin, level).await?;
            println!("ok");
        }
        Command::Listen { names } => {
            for name in &names {
                spark.on(name.as_str(), print_event);
            }
            spark.listen_for_events(names).await?;
            tracing::info!("listening, press Ctrl-C to stop");
            tokio::signal::ctrl_c().await?;
        }
        Command::Call { function, args } => {
            let args: Vec<&str> = args.iter().map(String::as_str).collect();
            println!("{}", spark.call_function(&function, &args).await?);
        }
        Command::Variable { name } => {
            println!("{}", spark.variable(&name).await?);
        }
    }
    Ok(())
}

fn print_event(event: &DeviceEvent) {
    match serde_json::to_string(event) {
        Ok(line) => println!("{}", line),
        Err(e) => tracing::warn!(error = %e, "failed to encode event"),
    }
}
