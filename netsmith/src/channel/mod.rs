//! Interactive command channel over an SSH PTY.
//!
//! Network devices are driven through a shell PTY, not exec channels:
//! output accumulates in a [`PatternBuffer`] until the device prompt is
//! seen at the tail, then the echoed command and trailing prompt are
//! stripped off. [`DeviceChannel`] is the seam the deployment session is
//! generic over, so session logic is testable without a live device.

mod buffer;

pub use buffer::PatternBuffer;

use std::future::Future;
use std::time::Duration;

use log::{debug, trace};
use regex::bytes::Regex;
use russh::{Channel, ChannelMsg, client::Msg};

use crate::error::ChannelError;
use crate::transport::SshTransport;

/// A remote command executor for one device.
///
/// Implemented by [`CommandChannel`] for live SSH sessions and by scripted
/// fakes in tests. `'static` because a cancelled deployment moves its
/// channel into a background rollback task.
pub trait DeviceChannel: Send + 'static {
    /// Send one command and return its cleaned output (echo and trailing
    /// prompt removed).
    ///
    /// A device-reported failure surfaces as
    /// [`ChannelError::CommandRejected`], never as partial output.
    fn run(
        &mut self,
        command: &str,
    ) -> impl Future<Output = std::result::Result<String, ChannelError>> + Send;

    /// Close the channel.
    fn close(self) -> impl Future<Output = std::result::Result<(), ChannelError>> + Send;
}

/// Live SSH command channel with prompt-based framing.
///
/// Owns its transport: the SSH connection lives exactly as long as the
/// channel does.
pub struct CommandChannel {
    transport: SshTransport,
    channel: Channel<Msg>,
    buffer: PatternBuffer,
    prompt: Regex,
    failure_patterns: Vec<String>,
    timeout: Duration,
}

impl CommandChannel {
    /// Open a PTY shell on the transport and wait out the login banner.
    pub async fn open(
        transport: SshTransport,
        prompt_pattern: &str,
        failure_patterns: Vec<String>,
        timeout: Duration,
    ) -> std::result::Result<Self, ChannelError> {
        let prompt = Regex::new(prompt_pattern)?;
        let channel = transport
            .open_channel()
            .await
            .map_err(|_| ChannelError::OpenFailed)?;

        let mut this = Self {
            transport,
            channel,
            buffer: PatternBuffer::default(),
            prompt,
            failure_patterns,
            timeout,
        };

        // Banner and MOTD end with the first prompt.
        this.read_until_prompt().await?;
        trace!("channel open, banner drained ({} bytes)", this.buffer.len());
        this.buffer.clear();
        Ok(this)
    }

    async fn read_until_prompt(&mut self) -> std::result::Result<(), ChannelError> {
        let deadline = tokio::time::Instant::now() + self.timeout;
        loop {
            if self.buffer.tail_contains(&self.prompt) {
                return Ok(());
            }
            let msg = tokio::time::timeout_at(deadline, self.channel.wait())
                .await
                .map_err(|_| ChannelError::PromptTimeout(self.timeout))?;
            match msg {
                Some(ChannelMsg::Data { ref data }) => self.buffer.extend(data),
                Some(ChannelMsg::ExtendedData { ref data, .. }) => self.buffer.extend(data),
                Some(ChannelMsg::Eof) | Some(ChannelMsg::Close) | None => {
                    return Err(ChannelError::Closed);
                }
                Some(_) => {}
            }
        }
    }

}

/// Strip the echoed command from the front and the prompt from the back.
fn clean_output(prompt: &Regex, raw: &str, command: &str) -> String {
    let mut lines: Vec<&str> = raw.lines().collect();
    if lines.first().is_some_and(|l| l.contains(command)) {
        lines.remove(0);
    }
    while let Some(last) = lines.last() {
        if prompt.is_match(last.as_bytes()) || last.trim().is_empty() {
            lines.pop();
        } else {
            break;
        }
    }
    lines.join("\n").trim().to_string()
}

impl DeviceChannel for CommandChannel {
    async fn run(&mut self, command: &str) -> std::result::Result<String, ChannelError> {
        debug!("send: {command}");
        self.buffer.clear();

        let line = format!("{command}\r\n");
        self.channel
            .data(line.as_bytes())
            .await
            .map_err(ChannelError::Ssh)?;

        self.read_until_prompt().await?;

        let raw = self.buffer.as_str_lossy().into_owned();
        let output = clean_output(&self.prompt, &raw, command);

        for pattern in &self.failure_patterns {
            if output.contains(pattern.as_str()) {
                return Err(ChannelError::CommandRejected {
                    command: command.to_string(),
                    output,
                });
            }
        }

        Ok(output)
    }

    async fn close(self) -> std::result::Result<(), ChannelError> {
        self.channel.eof().await.map_err(ChannelError::Ssh)?;
        self.channel.close().await.map_err(ChannelError::Ssh)?;
        self.transport.close().await.map_err(|_| ChannelError::Closed)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_echo_and_prompt_stripped() {
        let prompt = Regex::new(r"\[admin@[^\]]+\] > $").unwrap();
        let raw = "/ip address print\r\n0 192.168.1.1/24 bridge-lan\r\n[admin@gw] > ";
        assert_eq!(
            clean_output(&prompt, raw, "/ip address print"),
            "0 192.168.1.1/24 bridge-lan"
        );
    }

    #[test]
    fn test_output_without_echo_kept_whole() {
        let prompt = Regex::new(r"\$ $").unwrap();
        let raw = "line one\nline two\n$ ";
        assert_eq!(
            clean_output(&prompt, raw, "show something"),
            "line one\nline two"
        );
    }

    #[test]
    fn test_blank_lines_before_prompt_dropped() {
        let prompt = Regex::new(r"# $").unwrap();
        let raw = "set interfaces ethernet eth0\r\n[edit]\r\n\r\n# ";
        assert_eq!(
            clean_output(&prompt, raw, "set interfaces ethernet eth0"),
            "[edit]"
        );
    }
}
