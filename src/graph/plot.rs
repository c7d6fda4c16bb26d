// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/thermowatch

//! rrdtool graph definitions shared by every rendered range

use std::path::PathBuf;

use super::solar::SunTimes;

/// Line colours, cycled per sensor
pub const PALETTE: [&str; 5] = ["#FF0000", "#00DC00", "#00FF00", "#0000FF", "#8F4F00"];

const NIGHT_SHADE: &str = "#E0E0E0";
const TWILIGHT_SHADE: &str = "#CCCCCC";

/// One line on the chart
#[derive(Debug, Clone, PartialEq)]
pub struct PlotSeries {
    pub vname: String,
    pub rrd_file: PathBuf,
    pub color: &'static str,
    pub label: String,
}

impl PlotSeries {
    /// Assign variable names and palette colours in order
    pub fn assign(entries: impl IntoIterator<Item = (String, PathBuf)>) -> Vec<PlotSeries> {
        entries
            .into_iter()
            .enumerate()
            .map(|(i, (label, rrd_file))| PlotSeries {
                vname: format!("s{}", i),
                rrd_file,
                color: PALETTE[i % PALETTE.len()],
                label,
            })
            .collect()
    }
}

/// rrdtool treats `:` as a field separator
fn escape(s: &str) -> String {
    s.replace(':', "\\:")
}

/// `value` for times of day outside `[start, end]`, unknown inside
fn outside_window(name: &str, start: u32, end: u32, fill: &str, vname: &str) -> String {
    format!(
        "CDEF:{name}=LTIME,86400,%,{start},LT,{fill},LTIME,86400,%,{end},GT,{fill},UNKN,{vname},*,IF,IF"
    )
}

/// Build the full definition list for `series`, shading night and twilight
pub fn build_definitions(series: &[PlotSeries], sun: &SunTimes) -> Vec<String> {
    let mut defs = vec![
        "COMMENT:Location\\t    Last\\t\\tAvg\\t\\tMax\\t\\tMin\\n".to_string(),
        "HRULE:0#0000FF:freezing\\n".to_string(),
    ];

    for (i, s) in series.iter().enumerate() {
        let v = &s.vname;
        defs.push(format!("DEF:{}={}:a:AVERAGE", v, escape(&s.rrd_file.display().to_string())));
        defs.push(format!("LINE2:{}{}:{}\\t", v, s.color, escape(&s.label)));
        defs.push(format!("GPRINT:{}:LAST:%5.1lf °C\\t", v));
        defs.push(format!("GPRINT:{}:AVERAGE:%5.1lf °C\\t", v));
        defs.push(format!("GPRINT:{}:MAX:%5.1lf °C\\t", v));
        defs.push(format!("GPRINT:{}:MIN:%5.1lf °C\\n", v));

        if i == 0 {
            defs.push(outside_window("nightplus", sun.sunrise, sun.sunset, "INF", v));
            defs.push(outside_window("nightminus", sun.sunrise, sun.sunset, "NEGINF", v));
            defs.push(format!("AREA:nightplus{}", NIGHT_SHADE));
            defs.push(format!("AREA:nightminus{}", NIGHT_SHADE));
            defs.push(outside_window("dusktill", sun.dawn, sun.dusk, "INF", v));
            defs.push(outside_window("dawntill", sun.dawn, sun.dusk, "NEGINF", v));
            defs.push(format!("AREA:dusktill{}", TWILIGHT_SHADE));
            defs.push(format!("AREA:dawntill{}", TWILIGHT_SHADE));
        }
    }

    defs
}
