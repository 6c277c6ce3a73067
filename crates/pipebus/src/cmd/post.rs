use std::fs;

use pipebus_channel::Channel;
use pipebus_frame::{encode_frame, FrameConfig};

use crate::cmd::{channel_config, PostArgs};
use crate::exit::{channel_error, frame_error, CliResult, FAILURE, SUCCESS};
use crate::output::{print_post, OutputFormat};

pub fn run(args: PostArgs, format: OutputFormat) -> CliResult<i32> {
    let config = channel_config(args.delimiter, args.retries, &args.retry_delay)?;
    let payload = resolve_payload(&args)?;

    // Size the frame up front so the report matches what goes on the wire.
    let frame_config = FrameConfig {
        delimiter: config.delimiter,
        max_payload: config.max_payload,
    };
    let frame_size = encode_frame(&args.topic, &payload, &frame_config)
        .map_err(|err| frame_error("invalid message", err))?
        .len();

    let channel = Channel::open_with_config(&args.name, config)
        .map_err(|err| channel_error("open failed", err))?;

    let confirmed = channel
        .post_message(&args.topic, &payload)
        .map_err(|err| channel_error("post failed", err))?;

    print_post(&args.name, &args.topic, frame_size, confirmed, format);

    if confirmed {
        Ok(SUCCESS)
    } else {
        Ok(FAILURE)
    }
}

fn resolve_payload(args: &PostArgs) -> CliResult<Vec<u8>> {
    if let Some(data) = &args.data {
        return Ok(data.as_bytes().to_vec());
    }
    if let Some(path) = &args.file {
        return fs::read(path).map_err(|err| {
            crate::exit::io_error(&format!("failed reading {}", path.display()), err)
        });
    }
    Ok(Vec::new())
}
