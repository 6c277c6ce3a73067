use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::time::Duration;

use pipebus_channel::Channel;

use crate::cmd::{channel_config, ListenArgs};
use crate::exit::{channel_error, CliError, CliResult, SUCCESS};
use crate::output::{print_message, OutputFormat};

pub fn run(args: ListenArgs, format: OutputFormat) -> CliResult<i32> {
    let config = channel_config(args.delimiter, 0, "0ms")?;
    let channel = Channel::open_with_config(&args.name, config)
        .map_err(|err| channel_error("open failed", err))?;

    // Callbacks run concurrently; a single consumer keeps stdout whole.
    let (tx, rx) = mpsc::channel();
    for topic in &args.topics {
        let tx = tx.clone();
        let topic_name = topic.clone();
        channel.subscribe(topic.clone(), move |payload| {
            let _ = tx.send((topic_name.clone(), payload));
        });
    }
    drop(tx);

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    let mut printed = 0usize;
    while running.load(Ordering::SeqCst) {
        let (topic, payload) = match rx.recv_timeout(Duration::from_millis(200)) {
            Ok(message) => message,
            Err(mpsc::RecvTimeoutError::Timeout) => continue,
            Err(mpsc::RecvTimeoutError::Disconnected) => break,
        };

        print_message(&args.name, &topic, &payload, format);
        printed = printed.saturating_add(1);

        if let Some(count) = args.count {
            if printed >= count {
                break;
            }
        }
    }

    channel.close();
    Ok(SUCCESS)
}

fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| {
        CliError::new(
            crate::exit::INTERNAL,
            format!("signal handler setup failed: {err}"),
        )
    })
}
