use aws_sdk_cloudwatchlogs::error::SdkError;
use aws_sdk_cloudwatchlogs::operation::get_log_events::GetLogEventsError;
use aws_sdk_cloudwatchlogs::types::OutputLogEvent;
use ecs_deploy_core::error::{DeployError, ResourceKind};
use ecs_deploy_core::migration::{LogPage, LogReader};

use super::{block_on, dependency_error};

#[derive(Debug, Clone)]
pub struct CloudWatchLogReader {
    client: aws_sdk_cloudwatchlogs::Client,
}

impl CloudWatchLogReader {
    pub fn new(client: aws_sdk_cloudwatchlogs::Client) -> Self {
        Self { client }
    }
}

impl LogReader for CloudWatchLogReader {
    fn read_page(
        &self,
        log_group: &str,
        log_stream: &str,
        token: Option<&str>,
    ) -> Result<LogPage, DeployError> {
        let result = block_on(
            self.client
                .get_log_events()
                .log_group_name(log_group)
                .log_stream_name(log_stream)
                .start_from_head(true)
                .set_next_token(token.map(str::to_string))
                .send(),
        );

        let output = match result {
            Ok(output) => output,
            Err(SdkError::ServiceError(context)) => {
                return Err(read_error(log_group, log_stream, context.into_err()));
            }
            Err(error) => return Err(dependency_error("logs:GetLogEvents", error)),
        };

        Ok(LogPage {
            lines: output.events().iter().filter_map(event_line).collect(),
            next_forward_token: output.next_forward_token().map(str::to_string),
        })
    }
}

fn read_error(log_group: &str, log_stream: &str, error: GetLogEventsError) -> DeployError {
    if error.is_resource_not_found_exception() {
        DeployError::not_found(
            ResourceKind::LogStream,
            format!("{log_group}:{log_stream}"),
        )
    } else {
        dependency_error("logs:GetLogEvents", error)
    }
}

/// Message of one event without the trailing line break the log driver keeps.
fn event_line(event: &OutputLogEvent) -> Option<String> {
    event
        .message()
        .map(|message| message.trim_end_matches(&['\r', '\n'][..]).to_string())
}
