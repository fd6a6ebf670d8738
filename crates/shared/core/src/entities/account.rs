use serde::{Deserialize, Serialize};

use crate::values::Volume;

/// Balance of one currency/account on one gateway
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub account_id: String,
    pub balance: Volume,
    pub frozen: Volume,
    pub gateway_name: String,
}

impl Account {
    pub fn available(&self) -> Volume {
        self.balance - self.frozen
    }

    pub fn vt_account_id(&self) -> String {
        format!("{}.{}", self.gateway_name, self.account_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_available_excludes_frozen() {
        let account = Account {
            account_id: "usdt".to_string(),
            balance: dec!(100),
            frozen: dec!(30),
            gateway_name: "HUOBI".to_string(),
        };
        assert_eq!(account.available(), dec!(70));
        assert_eq!(account.vt_account_id(), "HUOBI.usdt");
    }
}
