use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc;

/// Forwards the non-empty lines of `reader` into `tx`, in order
///
/// Stops early when the receiving side is gone. Returns the number of lines
/// forwarded.
pub async fn pump_lines<R>(reader: R, tx: mpsc::Sender<String>) -> std::io::Result<u64>
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(reader).lines();
    let mut forwarded = 0;

    while let Some(line) = lines.next_line().await? {
        let line = line.trim_end_matches('\r');
        if line.is_empty() {
            continue;
        }
        if tx.send(line.to_string()).await.is_err() {
            tracing::debug!("Input stream receiver dropped after {} lines", forwarded);
            break;
        }
        forwarded += 1;
    }

    Ok(forwarded)
}
