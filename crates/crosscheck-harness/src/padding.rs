//! Request padding: grow or shrink request payloads to exact encoded sizes.
//!
//! A case's `expand_requests` directives pair up with its request messages by
//! position. Each directive names a size relative to [`SERVER_RECEIVE_LIMIT`];
//! the matching message's `request_data` is zero-filled or truncated until the
//! whole message encodes to exactly that many bytes.

use crosscheck_model::{EncodedLen, PaddedRequest as _, RequestMessage, TestCase};

use crate::config::SERVER_RECEIVE_LIMIT;
use crate::error::PaddingError;

/// Resizing a payload can move its length prefix across a varint boundary,
/// so the first adjustment may land a few bytes off.
const MAX_ADJUSTMENTS: usize = 2;

/// Apply every size directive of `case` to its request messages.
pub fn expand_request_data(case: &mut TestCase) -> Result<(), PaddingError> {
    let requests = &mut case.request.request_messages;
    if case.expand_requests.len() > requests.len() {
        return Err(PaddingError::TooManyDirectives {
            directives: case.expand_requests.len(),
            requests: requests.len(),
        });
    }
    for (i, directive) in case.expand_requests.iter().enumerate() {
        let Some(delta) = directive.size_relative_to_limit else {
            continue;
        };
        let index = i + 1;
        let target = i64::from(SERVER_RECEIVE_LIMIT) + i64::from(delta);
        let target_len = u32::try_from(target)
            .map_err(|_| PaddingError::InvalidTarget {
                index,
                delta,
                target,
            })?;
        pad_to(&mut requests[i], target_len as usize, index)?;
    }
    Ok(())
}

/// Resize one message's payload until it encodes to `target` bytes.
pub fn pad_to(message: &mut RequestMessage, target: usize, index: usize) -> Result<(), PaddingError> {
    if !message.has_padding_field() {
        return Err(PaddingError::NoPaddingField {
            index,
            type_url: message.type_url(),
        });
    }
    let mut size = message.encoded_len();
    for _ in 0..MAX_ADJUSTMENTS {
        if size == target {
            return Ok(());
        }
        if let Some(padded) = message.padded_mut() {
            let data = padded.request_data_mut();
            let new_len = if size < target {
                data.len() + (target - size)
            } else {
                data.len().saturating_sub(size - target)
            };
            data.resize(new_len, 0);
        }
        size = message.encoded_len();
    }
    if size == target {
        Ok(())
    } else {
        Err(PaddingError::Unreachable {
            index,
            target: target as i64,
            closest: size,
        })
    }
}
