//! Descriptive FIX MsgType (tag 35) and ExecType (tag 150) name tables,
//! used for logging only — they never affect session semantics.

/// Message type codes this harness actively constructs or reacts to.
pub mod msg_type {
    pub const HEARTBEAT: &str = "0";
    pub const TEST_REQUEST: &str = "1";
    pub const RESEND_REQUEST: &str = "2";
    pub const REJECT: &str = "3";
    pub const SEQUENCE_RESET: &str = "4";
    pub const LOGOUT: &str = "5";
    pub const IOI: &str = "6";
    pub const ADVERTISEMENT: &str = "7";
    pub const EXECUTION_REPORT: &str = "8";
    pub const ORDER_CANCEL_REJECT: &str = "9";
    pub const LOGON: &str = "A";
    pub const NEW_ORDER_SINGLE: &str = "D";
    pub const ORDER_CANCEL_REQUEST: &str = "F";
    pub const ORDER_CANCEL_REPLACE_REQUEST: &str = "G";
}

/// Look up a human-readable name for a MsgType code. Unknown codes render
/// as `"???"`.
pub fn find_msg_type(code: &str) -> &'static str {
    match code {
        "0" => "Heartbeat",
        "1" => "TestRequest",
        "2" => "ResendRequest",
        "3" => "Reject",
        "4" => "SequenceReset",
        "5" => "Logout",
        "6" => "IOI",
        "7" => "Advertisement",
        "8" => "ExecutionReport",
        "9" => "OrderCancelReject",
        "A" => "Logon",
        "B" => "News",
        "C" => "Email",
        "D" => "NewOrderSingle",
        "E" => "NewOrderList",
        "F" => "OrderCancelRequest",
        "G" => "OrderCancelReplaceRequest",
        "H" => "OrderStatusRequest",
        "J" => "AllocationInstruction",
        "K" => "ListCancelRequest",
        "L" => "ListExecute",
        "M" => "ListStatusRequest",
        "N" => "ListStatus",
        "P" => "AllocationInstructionAck",
        "Q" => "DontKnowTrade",
        "R" => "QuoteRequest",
        "S" => "Quote",
        "T" => "SettlementInstructions",
        "V" => "MarketDataRequest",
        "W" => "MarketDataSnapshotFullRefresh",
        "X" => "MarketDataIncrementalRefresh",
        "Y" => "MarketDataRequestReject",
        "Z" => "QuoteCancel",
        "a" => "QuoteStatusRequest",
        "b" => "MassQuoteAcknowledgement",
        "c" => "SecurityDefinitionRequest",
        "d" => "SecurityDefinition",
        "e" => "SecurityStatusRequest",
        "f" => "SecurityStatus",
        "g" => "TradingSessionStatusRequest",
        "h" => "TradingSessionStatus",
        "i" => "MassQuote",
        "j" => "BusinessMessageReject",
        "k" => "BidRequest",
        "l" => "BidResponse",
        "m" => "ListStrikePrice",
        "n" => "XMLnonFIX",
        "o" => "RegistrationInstructions",
        "p" => "RegistrationInstructionsResponse",
        "q" => "OrderMassCancelRequest",
        "r" => "OrderMassCancelReport",
        "s" => "NewOrderCross",
        "t" => "CrossOrderCancelReplaceRequest",
        "u" => "CrossOrderCancelRequest",
        "v" => "SecurityTypeRequest",
        "w" => "SecurityTypes",
        "x" => "SecurityListRequest",
        "y" => "SecurityList",
        "z" => "DerivativeSecurityListRequest",
        "AA" => "DerivativeSecurityList",
        "AB" => "NewOrderMultileg",
        "AC" => "MultilegOrderCancelReplace",
        "AD" => "TradeCaptureReportRequest",
        "AE" => "TradeCaptureReport",
        "AF" => "OrderMassStatusRequest",
        "AG" => "QuoteRequestReject",
        "AH" => "RFQRequest",
        "AI" => "QuoteStatusReport",
        "AJ" => "QuoteResponse",
        "AK" => "Confirmation",
        "AL" => "PositionMaintenanceRequest",
        "AM" => "PositionMaintenanceReport",
        "AN" => "RequestForPositions",
        "AO" => "RequestForPositionsAck",
        "AP" => "PositionReport",
        "AQ" => "TradeCaptureReportRequestAck",
        "AR" => "TradeCaptureReportAck",
        "AS" => "AllocationReport",
        "AT" => "AllocationReportAck",
        "AU" => "ConfirmationAck",
        "AV" => "SettlementInstructionRequest",
        "AW" => "AssignmentReport",
        "AX" => "CollateralRequest",
        "AY" => "CollateralAssignment",
        "AZ" => "CollateralResponse",
        "BA" => "CollateralReport",
        "BB" => "CollateralInquiry",
        "BC" => "NetworkCounterpartySystemStatusRequest",
        "BD" => "NetworkCounterpartySystemStatusResponse",
        "BE" => "UserRequest",
        "BF" => "UserResponse",
        "BG" => "CollateralInquiryAck",
        "BH" => "ConfirmationRequest",
        "BI" => "TradingSessionList",
        "BJ" => "SettlementObligationReport",
        "BK" => "DerivativeSecurityListUpdateReport",
        "BL" => "TradingSessionListRequest",
        "BM" => "SecurityListUpdateReport",
        "BN" => "AdjustedPositionReport",
        "BO" => "AllocationInstructionAlert",
        "BP" => "ExecutionAcknowledgement",
        "BQ" => "ContraryIntentionReport",
        "BR" => "SecurityDefinitionUpdateReport",
        "BS" => "SecurityListUpdateReport",
        "BT" => "MarketDefinitionRequest",
        "BU" => "MarketDefinition",
        "BV" => "MarketDefinitionUpdateReport",
        "BW" => "ApplicationMessageRequest",
        "BX" => "ApplicationMessageRequestAck",
        "BY" => "ApplicationMessageReport",
        _ => "???",
    }
}

/// Look up a human-readable name for an ExecType (tag 150) code.
pub fn find_exec_type(code: &str) -> &'static str {
    match code {
        "0" => "New",
        "1" => "PartialFill",
        "2" => "Fill",
        "3" => "DoneForDay",
        "4" => "Canceled",
        "5" => "Replaced",
        "6" => "PendingCancel",
        "7" => "Stopped",
        "8" => "Rejected",
        "9" => "Suspended",
        "A" => "PendingNew",
        "B" => "Calculated",
        "C" => "Expired",
        "D" => "Restated",
        "E" => "PendingReplace",
        "F" => "Trade",
        "G" => "TradeCorrect",
        "H" => "TradeCancel",
        "I" => "OrderStatus",
        "J" => "TradeInAClearingHold",
        "K" => "TradeHasBeenReleasedToClearing",
        "L" => "TriggeredOrActivatedBySystem",
        "M" => "Locked",
        "N" => "Released",
        _ => "???",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_codes_resolve() {
        assert_eq!(find_msg_type("A"), "Logon");
        assert_eq!(find_msg_type("8"), "ExecutionReport");
        assert_eq!(find_exec_type("2"), "Fill");
    }

    #[test]
    fn unknown_codes_render_as_placeholder() {
        assert_eq!(find_msg_type("??"), "???");
        assert_eq!(find_exec_type("??"), "???");
    }
}
