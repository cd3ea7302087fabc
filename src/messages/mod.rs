//! Application-message builders: NewOrderSingle and ExecutionReport,
//! constructed directly as [`Message`] values so they flow through the
//! same codec as every admin message.

use crate::message::Message;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecType {
    New,
    PartialFill,
    Fill,
    Canceled,
    Rejected,
}

impl ExecType {
    fn as_str(self) -> &'static str {
        match self {
            ExecType::New => "0",
            ExecType::PartialFill => "1",
            ExecType::Fill => "2",
            ExecType::Canceled => "4",
            ExecType::Rejected => "8",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrdStatus {
    New,
    PartiallyFilled,
    Filled,
    Canceled,
    Rejected,
}

impl OrdStatus {
    fn as_str(self) -> &'static str {
        match self {
            OrdStatus::New => "0",
            OrdStatus::PartiallyFilled => "1",
            OrdStatus::Filled => "2",
            OrdStatus::Canceled => "4",
            OrdStatus::Rejected => "8",
        }
    }
}

/// `new_order_message`: tags 11(ClOrdID), 21(HandlInst), 55(Symbol),
/// 54(Side), 60(TransactTime), 40(OrdType), mirroring the source's
/// required-field set for a NewOrderSingle.
#[derive(Debug, Default)]
pub struct NewOrderSingleBuilder {
    cl_ord_id: Option<String>,
    symbol: Option<String>,
    side: Option<char>,
    order_qty: Option<f64>,
    ord_type: char,
    extra: Vec<(u32, String)>,
}

impl NewOrderSingleBuilder {
    pub fn new() -> Self {
        Self {
            ord_type: '1',
            ..Default::default()
        }
    }
    pub fn cl_ord_id(mut self, v: impl Into<String>) -> Self {
        self.cl_ord_id = Some(v.into());
        self
    }
    pub fn symbol(mut self, v: impl Into<String>) -> Self {
        self.symbol = Some(v.into());
        self
    }
    pub fn side(mut self, v: char) -> Self {
        self.side = Some(v);
        self
    }
    pub fn order_qty(mut self, v: f64) -> Self {
        self.order_qty = Some(v);
        self
    }
    pub fn extra_tag(mut self, tag: u32, value: impl Into<String>) -> Self {
        self.extra.push((tag, value.into()));
        self
    }

    pub fn build(self) -> Message {
        let mut msg = Message::with_header_fields(&[8, 9, 35, 49, 56]);
        msg.set(35u32, "D");
        msg.set(11u32, self.cl_ord_id.unwrap_or_default());
        msg.set(21u32, "1");
        msg.set(55u32, self.symbol.unwrap_or_default());
        msg.set(54u32, self.side.unwrap_or('1').to_string());
        if let Some(qty) = self.order_qty {
            msg.set(38u32, qty.to_string());
        }
        msg.set(40u32, self.ord_type.to_string());
        for (tag, value) in self.extra {
            msg.set(tag, value);
        }
        msg
    }
}

/// `execution_report`: tags 37(OrderID), 17(ExecID), 20(ExecTransType),
/// 150(ExecType), 39(OrdStatus), 151(LeavesQty), 14(CumQty), 6(AvgPx),
/// with ClOrdID(11) carried over from the originating order.
#[derive(Debug, Default)]
pub struct ExecutionReportBuilder {
    cl_ord_id: Option<String>,
    order_id: Option<String>,
    exec_id: Option<String>,
    exec_type: Option<ExecType>,
    ord_status: Option<OrdStatus>,
    leaves_qty: Option<f64>,
    cum_qty: Option<f64>,
    last_px: Option<f64>,
    last_qty: Option<f64>,
    avg_px: Option<f64>,
}

impl ExecutionReportBuilder {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn cl_ord_id(mut self, v: impl Into<String>) -> Self {
        self.cl_ord_id = Some(v.into());
        self
    }
    pub fn order_id(mut self, v: impl Into<String>) -> Self {
        self.order_id = Some(v.into());
        self
    }
    pub fn exec_id(mut self, v: impl Into<String>) -> Self {
        self.exec_id = Some(v.into());
        self
    }
    pub fn exec_type(mut self, v: ExecType) -> Self {
        self.exec_type = Some(v);
        self
    }
    pub fn ord_status(mut self, v: OrdStatus) -> Self {
        self.ord_status = Some(v);
        self
    }
    pub fn leaves_qty(mut self, v: f64) -> Self {
        self.leaves_qty = Some(v);
        self
    }
    pub fn cum_qty(mut self, v: f64) -> Self {
        self.cum_qty = Some(v);
        self
    }
    pub fn last_px(mut self, v: f64) -> Self {
        self.last_px = Some(v);
        self
    }
    pub fn last_qty(mut self, v: f64) -> Self {
        self.last_qty = Some(v);
        self
    }
    pub fn avg_px(mut self, v: f64) -> Self {
        self.avg_px = Some(v);
        self
    }

    pub fn build(self) -> Message {
        let mut msg = Message::with_header_fields(&[8, 9, 35, 49, 56]);
        msg.set(35u32, "8");
        if let Some(v) = self.cl_ord_id {
            msg.set(11u32, v);
        }
        msg.set(37u32, self.order_id.unwrap_or_default());
        msg.set(17u32, self.exec_id.unwrap_or_default());
        msg.set(20u32, "0");
        msg.set(150u32, self.exec_type.unwrap_or(ExecType::Fill).as_str());
        msg.set(39u32, self.ord_status.unwrap_or(OrdStatus::Filled).as_str());
        msg.set(151u32, self.leaves_qty.unwrap_or_default().to_string());
        msg.set(14u32, self.cum_qty.unwrap_or_default().to_string());
        if let Some(px) = self.last_px {
            msg.set(31u32, px.to_string());
        }
        if let Some(qty) = self.last_qty {
            msg.set(32u32, qty.to_string());
        }
        msg.set(6u32, self.avg_px.unwrap_or_default().to_string());
        msg
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn execution_report_carries_client_order_id_and_exec_type() {
        let msg = ExecutionReportBuilder::new()
            .cl_ord_id("cl1")
            .order_id("ord1")
            .exec_id("exec1")
            .exec_type(ExecType::Fill)
            .ord_status(OrdStatus::Filled)
            .leaves_qty(0.0)
            .cum_qty(100.0)
            .avg_px(10.5)
            .build();
        assert_eq!(msg.get_str(35), Some("8"));
        assert_eq!(msg.get_str(11), Some("cl1"));
        assert_eq!(msg.get_str(150), Some("2"));
        assert_eq!(msg.get_str(39), Some("2"));
    }

    #[test]
    fn new_order_single_sets_required_tags() {
        let msg = NewOrderSingleBuilder::new()
            .cl_ord_id("cl1")
            .symbol("MSFT")
            .side('1')
            .order_qty(10.0)
            .build();
        assert_eq!(msg.get_str(35), Some("D"));
        assert_eq!(msg.get_str(55), Some("MSFT"));
        assert_eq!(msg.get_str(54), Some("1"));
    }
}
