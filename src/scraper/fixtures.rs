//! Saved page snapshots shared by scraper and pipeline tests.

use super::driver::fake::{FakeRace, FakeSite};

pub const TODAY: &str = "10/16/2026";

pub const LISTING_HTML: &str = r#"<!DOCTYPE html>
<html>
<head><title>Today's Races</title></head>
<body>
<div class="track-list">
    <div class="track track-list--row" id="race-GP-3">
        <div class="track-race-info">
            <span class="track-name" id="track-name-GP">ExpertEGulfstream ParkRace 3</span>
        </div>
        <div class="race-number"><span>Race 3</span></div>
    </div>
    <div class="track track-list--row" id="race-AQU-5">
        <div class="track-race-info">
            <span class="track-name">Aqueduct $50k Clm</span>
        </div>
        <div class="race-number"><span>Race 5</span></div>
    </div>
</div>
</body>
</html>"#;

pub fn detail_html(mtp: Option<u32>) -> String {
    let badge = mtp
        .map(|m| format!(r#"<div class="mtp-badge"><span class="mtp-value">{m}</span> MTP</div>"#))
        .unwrap_or_default();
    format!(
        r#"<html><body>{badge}<nav><a id="pools" href="/pools">Pools</a></nav></body></html>"#
    )
}

pub const POOLS_HTML: &str = r#"<html><body>
<div class="pools-basic">
    <div class="pools-header-totals">
        <span class="pools-row__win">$41,210</span>
        <span class="pools-row__place">$18,004</span>
        <span class="pools-row__show">$9,876</span>
    </div>
    <div class="pools-row">
        <span class="saddle-cloth">1</span>
        <span class="pools-odds">1/9</span>
        <span class="pools-row__win"><span class="amount">$13,686</span></span>
        <span class="pools-row__place"><span class="amount">$5,120</span></span>
        <span class="pools-row__show"><span class="amount">$2,004</span></span>
    </div>
    <div class="pools-row">
        <span class="saddle-cloth">2</span>
        <span class="pools-odds">15</span>
        <span class="pools-row__win"><span class="amount">$1,002</span></span>
        <span class="pools-row__place"><span class="amount">NR</span></span>
    </div>
</div>
</body></html>"#;

pub fn race(mtp: Option<u32>) -> FakeRace {
    FakeRace {
        detail_html: detail_html(mtp),
        pools_html: Some(POOLS_HTML.to_string()),
    }
}

/// Both listing rows lead to a race page with MTP and pools
pub fn site() -> FakeSite {
    FakeSite::new(LISTING_HTML)
        .with_race("race-GP-3", race(Some(7)))
        .with_race("race-AQU-5", race(Some(12)))
}
