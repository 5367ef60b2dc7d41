pub mod activity;
pub mod batch_lots;
pub mod codes;
pub mod inventory_check;
pub mod product_stock;
pub mod stock_in;
pub mod stock_out;

pub use activity::{ActivityEntry, ActivitySink, ReversalCleanup, TracingActivitySink};
pub use batch_lots::{AllocationEntry, AllocationPlan, BatchLotService, BatchUpdate};
pub use inventory_check::{
    CountUpdate, InventoryCheckDocument, InventoryCheckService, NewCheckItem, NewInventoryCheck,
};
pub use product_stock::{ProductLocks, ProductStockService, RecomputeScope};
pub use stock_in::{NewStockIn, NewStockInItem, StockInDocument, StockInService, StockInUpdate};
pub use stock_out::{
    NewStockOut, NewStockOutItem, StockOutDocument, StockOutLine, StockOutService, StockOutUpdate,
};
