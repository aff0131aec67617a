//! Solidity interface definitions for on-chain interactions.
//!
//! Contains the minimal ABI surface the marketplace client needs:
//! - [`IStablecoin`]: the mock stablecoin (ERC-20 subset plus a public `mint`)
//! - [`IDeworld`]: the marketplace purchase entry point and its `Sale` event
//! - [`IPaymasterFlow`]: zkSync paymaster input encodings

use alloy_primitives::{Bytes, U256};
use alloy_sol_types::{SolCall, sol};
use deworld::client::ContractCall;

sol! {
    /// Mock stablecoin used for prices and paymaster fees.
    #[allow(missing_docs)]
    #[derive(Debug)]
    interface IStablecoin {
        function balanceOf(address account) external view returns (uint256);
        function approve(address spender, uint256 amount) external returns (bool);
        function mint() external;
    }
}

sol! {
    /// Marketplace escrow contract.
    ///
    /// `Sale` is emitted once per successful `purchaseProduct`.
    #[allow(missing_docs)]
    #[derive(Debug)]
    interface IDeworld {
        event Sale(
            uint256 indexed purchaseId,
            uint256 productId,
            address indexed buyer,
            address indexed seller,
            uint256 totalAmount
        );

        function purchaseProduct(uint256 _productId, uint256 _quantity) external payable;
    }
}

sol! {
    /// zkSync paymaster flows. Only the selectors and argument encodings are
    /// used; these functions are never called directly.
    ///
    /// Reference: <https://docs.zksync.io/build/developer-reference/account-abstraction/paymasters>
    #[allow(missing_docs)]
    #[derive(Debug)]
    interface IPaymasterFlow {
        function general(bytes input) external;
        function approvalBased(address _token, uint256 _minAllowance, bytes _innerInput) external;
    }
}

/// ABI-encodes a marketplace-level call.
#[must_use]
pub fn calldata(call: &ContractCall) -> Bytes {
    match *call {
        ContractCall::Approve { spender, amount } => {
            IStablecoin::approveCall { spender, amount }.abi_encode().into()
        }
        ContractCall::PurchaseProduct {
            product_id,
            quantity,
        } => IDeworld::purchaseProductCall {
            _productId: product_id,
            _quantity: U256::from(quantity),
        }
        .abi_encode()
        .into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{Address, hex};

    #[test]
    fn test_selectors() {
        assert_eq!(IStablecoin::approveCall::SELECTOR, hex!("095ea7b3"));
        assert_eq!(IStablecoin::balanceOfCall::SELECTOR, hex!("70a08231"));
        assert_eq!(IStablecoin::mintCall::SELECTOR, hex!("1249c58b"));
        assert_eq!(IPaymasterFlow::approvalBasedCall::SELECTOR, hex!("949431dc"));
        assert_eq!(IPaymasterFlow::generalCall::SELECTOR, hex!("8c5a3445"));
    }

    #[test]
    fn test_purchase_calldata() {
        let data = calldata(&ContractCall::PurchaseProduct {
            product_id: U256::from(7u64),
            quantity: 2,
        });
        assert_eq!(&data[..4], IDeworld::purchaseProductCall::SELECTOR.as_slice());
        let decoded = IDeworld::purchaseProductCall::abi_decode(&data).unwrap();
        assert_eq!(decoded._productId, U256::from(7u64));
        assert_eq!(decoded._quantity, U256::from(2u64));
    }

    #[test]
    fn test_approve_calldata() {
        let spender = Address::repeat_byte(0x22);
        let data = calldata(&ContractCall::Approve {
            spender,
            amount: U256::from(10_000_000u64),
        });
        let decoded = IStablecoin::approveCall::abi_decode(&data).unwrap();
        assert_eq!(decoded.spender, spender);
        assert_eq!(decoded.amount, U256::from(10_000_000u64));
    }
}
