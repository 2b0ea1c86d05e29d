//! Router call selection and ABI encoding
//!
//! All supported DEX routers are driven through the Uniswap V2 router ABI.
//! [`RouterCall`] picks the correct entrypoint for the shape of the swap:
//! native in, native out, or token to token. Router paths always run over
//! wrapped-native, so the caller resolves endpoints through the registry
//! before selection.

use alloy::primitives::{Address, U256};
use alloy::sol;
use alloy::sol_types::SolCall;

sol! {
    interface IUniswapV2Router02 {
        function swapExactETHForTokens(
            uint256 amountOutMin,
            address[] calldata path,
            address to,
            uint256 deadline
        ) external payable returns (uint256[] memory amounts);

        function swapExactTokensForETH(
            uint256 amountIn,
            uint256 amountOutMin,
            address[] calldata path,
            address to,
            uint256 deadline
        ) external returns (uint256[] memory amounts);

        function swapExactTokensForTokens(
            uint256 amountIn,
            uint256 amountOutMin,
            address[] calldata path,
            address to,
            uint256 deadline
        ) external returns (uint256[] memory amounts);
    }

    interface IERC20 {
        function approve(address spender, uint256 amount) external returns (bool);
        function balanceOf(address owner) external view returns (uint256);
        function decimals() external view returns (uint8);
    }
}

/// The router entrypoint chosen for a swap, with everything needed to
/// encode it.
#[derive(Debug, Clone, PartialEq)]
pub enum RouterCall {
    /// Native in: amount rides as transaction value.
    EthForTokens {
        amount_in: U256,
        min_amount_out: U256,
        path: Vec<Address>,
        recipient: Address,
        deadline: U256,
    },
    /// Native out: amount is the first path hop's token.
    TokensForEth {
        amount_in: U256,
        min_amount_out: U256,
        path: Vec<Address>,
        recipient: Address,
        deadline: U256,
    },
    TokensForTokens {
        amount_in: U256,
        min_amount_out: U256,
        path: Vec<Address>,
        recipient: Address,
        deadline: U256,
    },
}

impl RouterCall {
    pub fn select(
        from_native: bool,
        to_native: bool,
        amount_in: U256,
        min_amount_out: U256,
        path: Vec<Address>,
        recipient: Address,
        deadline: U256,
    ) -> Self {
        match (from_native, to_native) {
            (true, _) => RouterCall::EthForTokens {
                amount_in,
                min_amount_out,
                path,
                recipient,
                deadline,
            },
            (false, true) => RouterCall::TokensForEth {
                amount_in,
                min_amount_out,
                path,
                recipient,
                deadline,
            },
            (false, false) => RouterCall::TokensForTokens {
                amount_in,
                min_amount_out,
                path,
                recipient,
                deadline,
            },
        }
    }

    /// ABI-encoded calldata for the selected entrypoint.
    pub fn calldata(&self) -> Vec<u8> {
        match self {
            RouterCall::EthForTokens {
                min_amount_out,
                path,
                recipient,
                deadline,
                ..
            } => IUniswapV2Router02::swapExactETHForTokensCall {
                amountOutMin: *min_amount_out,
                path: path.clone(),
                to: *recipient,
                deadline: *deadline,
            }
            .abi_encode(),
            RouterCall::TokensForEth {
                amount_in,
                min_amount_out,
                path,
                recipient,
                deadline,
            } => IUniswapV2Router02::swapExactTokensForETHCall {
                amountIn: *amount_in,
                amountOutMin: *min_amount_out,
                path: path.clone(),
                to: *recipient,
                deadline: *deadline,
            }
            .abi_encode(),
            RouterCall::TokensForTokens {
                amount_in,
                min_amount_out,
                path,
                recipient,
                deadline,
            } => IUniswapV2Router02::swapExactTokensForTokensCall {
                amountIn: *amount_in,
                amountOutMin: *min_amount_out,
                path: path.clone(),
                to: *recipient,
                deadline: *deadline,
            }
            .abi_encode(),
        }
    }

    /// Native value attached to the transaction.
    pub fn value(&self) -> U256 {
        match self {
            RouterCall::EthForTokens { amount_in, .. } => *amount_in,
            _ => U256::ZERO,
        }
    }

}

/// Calldata granting the router an unlimited allowance on `spender`'s behalf.
pub fn approve_calldata(spender: Address) -> Vec<u8> {
    IERC20::approveCall {
        spender,
        amount: U256::MAX,
    }
    .abi_encode()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{addresses, routers};

    fn call(from_native: bool, to_native: bool) -> RouterCall {
        RouterCall::select(
            from_native,
            to_native,
            U256::from(1_000_000u64),
            U256::from(995_000u64),
            vec![addresses::WETH, addresses::USDC],
            Address::repeat_byte(0x11),
            U256::from(1_700_000_000u64),
        )
    }

    #[test]
    fn selects_entrypoint_by_endpoint_shape() {
        assert!(matches!(call(true, false), RouterCall::EthForTokens { .. }));
        assert!(matches!(call(false, true), RouterCall::TokensForEth { .. }));
        assert!(matches!(
            call(false, false),
            RouterCall::TokensForTokens { .. }
        ));
    }

    #[test]
    fn only_native_input_carries_value() {
        assert_eq!(call(true, false).value(), U256::from(1_000_000u64));
        assert_eq!(call(false, true).value(), U256::ZERO);
        assert_eq!(call(false, false).value(), U256::ZERO);
    }

    #[test]
    fn calldata_starts_with_matching_selector() {
        assert_eq!(
            &call(true, false).calldata()[..4],
            IUniswapV2Router02::swapExactETHForTokensCall::SELECTOR
        );
        assert_eq!(
            &call(false, true).calldata()[..4],
            IUniswapV2Router02::swapExactTokensForETHCall::SELECTOR
        );
        assert_eq!(
            &call(false, false).calldata()[..4],
            IUniswapV2Router02::swapExactTokensForTokensCall::SELECTOR
        );
    }

    #[test]
    fn approval_encodes_unlimited_allowance() {
        let data = approve_calldata(routers::UNISWAP_V2);
        assert_eq!(&data[..4], IERC20::approveCall::SELECTOR);
        // last word is the amount
        assert_eq!(&data[data.len() - 32..], U256::MAX.to_be_bytes::<32>());
    }
}
