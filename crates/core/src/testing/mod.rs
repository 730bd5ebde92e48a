//! Testing utilities and mock implementations.
//!
//! Mocks for every external seam (collection agent, workbook reader,
//! queue broker, report generator) so the full job lifecycle can be
//! exercised without real infrastructure.

mod mock_agent;
mod mock_broker;
mod mock_reporter;
mod mock_workbook;

pub use mock_agent::{MockAgent, MockBatch};
pub use mock_broker::MockBroker;
pub use mock_reporter::{MockReportGenerator, RecordedReport};
pub use mock_workbook::MockWorkbookReader;

use calamine::{Data, Range};

use crate::extractor::{Sheet, REQUIRED_HEADERS};

/// An in-memory sheet with the required header row and a single data row
/// for the given date and buybox price.
pub fn seeded_sheet(asin: &str, date: &str, buybox_price: f64) -> Sheet {
    let cells: Vec<Data> = vec![
        Data::String(date.to_string()),
        Data::Float(buybox_price),
        Data::Float(buybox_price + 1.0),
        Data::Empty,
        Data::Empty,
        Data::Empty,
        Data::Empty,
    ];
    let mut range = Range::new((0, 0), (1, (REQUIRED_HEADERS.len() - 1) as u32));
    for (c, header) in REQUIRED_HEADERS.iter().enumerate() {
        range.set_value((0, c as u32), Data::String(header.to_string()));
    }
    for (c, cell) in cells.into_iter().enumerate() {
        range.set_value((1, c as u32), cell);
    }
    Sheet {
        name: asin.to_string(),
        range,
    }
}
