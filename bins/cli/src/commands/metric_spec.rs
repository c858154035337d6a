//! Parsing of `--metric name=value[unit]` arguments.

use crate::error::CliError;
use rally_metrics_domain::MetricName;

/// Numeric part of a metric argument.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MetricAmount {
    /// Non-negative integer, recorded as a count.
    Count(u64),
    /// Anything else, recorded as a floating-point value.
    Value(f64),
}

/// One parsed `--metric` argument.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricSpec {
    pub name: MetricName,
    pub amount: MetricAmount,
    pub unit: String,
}

impl MetricSpec {
    /// Parse `name=value[unit]`, e.g. `indexing_throughput=5000docs/s` or
    /// `query_latency=12.5 ms`.
    pub fn parse(input: &str) -> Result<Self, CliError> {
        let (name, rest) = input
            .split_once('=')
            .ok_or_else(|| invalid(input, "expected name=value[unit]"))?;
        let name = MetricName::parse(name)?;

        let rest = rest.trim_start();
        let split = numeric_prefix_len(rest);
        if split == 0 {
            return Err(invalid(input, "missing numeric value"));
        }
        let (number, unit) = rest.split_at(split);

        let amount = if number.bytes().all(|byte| byte.is_ascii_digit()) {
            number
                .parse::<u64>()
                .map(MetricAmount::Count)
                .map_err(|_| invalid(input, "count out of range"))?
        } else {
            number
                .parse::<f64>()
                .map(MetricAmount::Value)
                .map_err(|_| invalid(input, "malformed number"))?
        };

        Ok(Self {
            name,
            amount,
            unit: unit.trim().to_owned(),
        })
    }
}

fn invalid(input: &str, reason: &str) -> CliError {
    CliError::InvalidInput(format!("metric `{input}`: {reason}"))
}

/// Length of the leading `[+-]digits[.digits][e[+-]digits]` run.
fn numeric_prefix_len(input: &str) -> usize {
    let bytes = input.as_bytes();
    let mut end = 0;
    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end += 1;
    }
    let digits_start = end;
    end += count_digits(bytes.get(end..).unwrap_or_default());
    let mut mantissa_digits = end - digits_start;
    if bytes.get(end) == Some(&b'.') {
        let fraction = count_digits(bytes.get(end + 1..).unwrap_or_default());
        if fraction > 0 || mantissa_digits > 0 {
            end += 1 + fraction;
            mantissa_digits += fraction;
        }
    }
    if mantissa_digits == 0 {
        return 0;
    }
    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut exponent = end + 1;
        if matches!(bytes.get(exponent), Some(b'+' | b'-')) {
            exponent += 1;
        }
        let digits = count_digits(bytes.get(exponent..).unwrap_or_default());
        if digits > 0 {
            end = exponent + digits;
        }
    }
    end
}

fn count_digits(bytes: &[u8]) -> usize {
    bytes.iter().take_while(|byte| byte.is_ascii_digit()).count()
}
