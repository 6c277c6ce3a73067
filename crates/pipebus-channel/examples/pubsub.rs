//! Two channels on one endpoint exchanging topic messages.
//!
//! Run with:
//!   cargo run --example pubsub

use std::sync::mpsc;
use std::time::Duration;

use pipebus_channel::Channel;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let name = format!("pubsub-example-{}", std::process::id());

    // First open creates the endpoint, second connects to it.
    let left = Channel::open(&name)?;
    let right = Channel::open(&name)?;

    let (tx, rx) = mpsc::channel();
    let greetings = tx.clone();
    left.subscribe("greetings", move |payload| {
        let _ = greetings.send(format!("left got: {}", String::from_utf8_lossy(&payload)));
    });
    right.subscribe("replies", move |payload| {
        let _ = tx.send(format!("right got: {}", String::from_utf8_lossy(&payload)));
    });

    if right.post_message("greetings", b"hello from the right side")? {
        println!("right -> left delivered");
    }
    if left.post_message("replies", b"hello back")? {
        println!("left -> right delivered");
    }

    for _ in 0..2 {
        println!("{}", rx.recv_timeout(Duration::from_secs(2))?);
    }

    left.close();
    right.close();
    Ok(())
}
