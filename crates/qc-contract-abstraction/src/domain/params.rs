//! # Transaction Parameters
//!
//! The parameter bag (`from`, `gas`, `value`, ...) that accompanies calls,
//! transactions and deployments, and the call-site argument variant that
//! separates it from positional arguments.

use crate::domain::abi::Token;
use crate::domain::value_objects::{Address, Bytes, U256};
use crate::errors::ContractError;
use serde::{Deserialize, Serialize};

/// Transaction parameters. Unset fields are omitted on the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TxParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas: Option<U256>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas_price: Option<U256>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<U256>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Bytes>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nonce: Option<U256>,
}

impl TxParams {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn from(mut self, from: Address) -> Self {
        self.from = Some(from);
        self
    }

    #[must_use]
    pub fn gas(mut self, gas: impl Into<U256>) -> Self {
        self.gas = Some(gas.into());
        self
    }

    #[must_use]
    pub fn gas_price(mut self, price: impl Into<U256>) -> Self {
        self.gas_price = Some(price.into());
        self
    }

    #[must_use]
    pub fn value(mut self, value: impl Into<U256>) -> Self {
        self.value = Some(value.into());
        self
    }

    #[must_use]
    pub fn data(mut self, data: impl Into<Bytes>) -> Self {
        self.data = Some(data.into());
        self
    }

    /// Returns `self` with every field set in `overlay` replaced.
    #[must_use]
    pub fn merged_with(&self, overlay: &Self) -> Self {
        Self {
            from: overlay.from.or(self.from),
            to: overlay.to.or(self.to),
            gas: overlay.gas.or(self.gas),
            gas_price: overlay.gas_price.or(self.gas_price),
            value: overlay.value.or(self.value),
            data: overlay.data.clone().or_else(|| self.data.clone()),
            nonce: overlay.nonce.or(self.nonce),
        }
    }

    /// Writes every field set in `overlay` into `self`.
    pub fn absorb(&mut self, overlay: &Self) {
        *self = self.merged_with(overlay);
    }
}

/// A call-site argument: either a positional ABI value or the trailing
/// parameter bag. Large integers are always `Positional`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallArg {
    Positional(Token),
    Options(TxParams),
}

macro_rules! positional_from {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for CallArg {
                fn from(value: $ty) -> Self {
                    Self::Positional(Token::from(value))
                }
            }
        )*
    };
}

positional_from!(Address, bool, U256, u64, &str, String);

impl From<Token> for CallArg {
    fn from(token: Token) -> Self {
        Self::Positional(token)
    }
}

impl From<TxParams> for CallArg {
    fn from(params: TxParams) -> Self {
        Self::Options(params)
    }
}

/// Splits positional values from an optional trailing parameter bag and
/// merges the bag over `defaults`.
///
/// # Errors
///
/// Returns [`ContractError::InvalidArguments`] if a parameter bag appears
/// anywhere but last.
pub fn split_args(
    args: Vec<CallArg>,
    defaults: &TxParams,
) -> Result<(Vec<Token>, TxParams), ContractError> {
    let mut args = args;
    let overlay = match args.last() {
        Some(CallArg::Options(_)) => match args.pop() {
            Some(CallArg::Options(params)) => params,
            _ => TxParams::default(),
        },
        _ => TxParams::default(),
    };

    let tokens = args
        .into_iter()
        .enumerate()
        .map(|(i, arg)| match arg {
            CallArg::Positional(token) => Ok(token),
            CallArg::Options(_) => Err(ContractError::InvalidArguments(format!(
                "parameter bag at position {i} must be the last argument"
            ))),
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok((tokens, defaults.merged_with(&overlay)))
}

// =============================================================================
// TESTS
// =============================================================================
