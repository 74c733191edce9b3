use anyhow::{anyhow, bail, Result};
use chrono::{NaiveDate, NaiveTime};
use lazy_static::lazy_static;
use regex::Regex;

use crate::geo::GeoPoint;

/// Single `B` record of an IGC file
#[derive(Debug, Clone, PartialEq)]
pub struct Fix {
    pub time: NaiveTime,
    pub position: GeoPoint,
    pub pressure_altitude: i32,
    pub gnss_altitude: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IgcTrack {
    pub date: NaiveDate,
    pub pilot: String,
    pub glider_type: String,
    pub glider_id: String,
    pub fixes: Vec<Fix>,
}

impl IgcTrack {
    pub fn points(&self) -> Vec<GeoPoint> {
        self.fixes.iter().map(|fix| fix.position).collect()
    }
}

pub fn parse(text: &str) -> Result<IgcTrack> {
    // Example:
    // AXXXABCFLIGHT:1
    // HFDTE190216
    // HFPLTPILOTINCHARGE:Miguel Angel Gordillo
    // HFGTYGLIDERTYPE:RV8
    // HFGIDGLIDERID:EC-XLL
    // B1101355206343N00006198WA0058700558

    lazy_static! {
        static ref DATE_RE: Regex = Regex::new(
            r#"(?x)
            ^HFDTE                  # date header
            (?:DATE:)?              # optional long form label
            (?P<day>\d{2})
            (?P<month>\d{2})
            (?P<year>\d{2})
        "#
        )
        .unwrap();
        static ref HEADER_RE: Regex = Regex::new(
            r#"(?x)
            ^H[FOP]                 # header incl. data source
            (?P<code>PLT|GTY|GID)   # pilot, glider type or glider id
            [^:]*:                  # long name incl. separator
            (?P<value>.*)$
        "#
        )
        .unwrap();
        static ref FIX_RE: Regex = Regex::new(
            r#"(?x)
            ^B
            (?P<time>\d{6})         # time in HHMMSS
            (?P<lat>\d{7})          # latitude angle in DDMMmmm
            (?P<lat_sign>[NS])      # latitude hemisphere
            (?P<lon>\d{8})          # longitude angle in DDDMMmmm
            (?P<lon_sign>[EW])      # longitude hemisphere
            [AV]                    # fix validity
            (?P<pressure>[-\d]\d{4}) # pressure altitude in meters
            (?P<gnss>[-\d]\d{4})     # GNSS altitude in meters
        "#
        )
        .unwrap();
    }

    let mut lines = text.lines().map(str::trim).filter(|line| !line.is_empty());

    match lines.next() {
        Some(line) if line.starts_with('A') => {}
        _ => bail!("not an IGC file: missing A record"),
    }

    let mut date = None;
    let mut pilot = String::new();
    let mut glider_type = String::new();
    let mut glider_id = String::new();
    let mut fixes = Vec::new();

    for line in lines {
        if let Some(caps) = DATE_RE.captures(line) {
            let day = caps["day"].parse::<u32>()?;
            let month = caps["month"].parse::<u32>()?;
            let year = caps["year"].parse::<i32>()?;

            // two digit years, the format was introduced in the 90s
            let year = if year >= 90 { 1900 + year } else { 2000 + year };

            date = Some(
                NaiveDate::from_ymd_opt(year, month, day)
                    .ok_or_else(|| anyhow!("invalid date in {:?}", line))?,
            );
        } else if let Some(caps) = HEADER_RE.captures(line) {
            let value = caps["value"].trim().to_owned();
            match &caps["code"] {
                "PLT" => pilot = value,
                "GTY" => glider_type = value,
                _ => glider_id = value,
            }
        } else if let Some(caps) = FIX_RE.captures(line) {
            fixes.push(parse_fix(&caps).ok_or_else(|| anyhow!("invalid B record {:?}", line))?);
        }
    }

    let date = date.ok_or_else(|| anyhow!("missing HFDTE record"))?;

    Ok(IgcTrack {
        date,
        pilot,
        glider_type,
        glider_id,
        fixes,
    })
}

fn parse_fix(caps: &regex::Captures<'_>) -> Option<Fix> {
    let time = NaiveTime::parse_from_str(&caps["time"], "%H%M%S").ok()?;

    let latitude = {
        let raw_angle = &caps["lat"];
        let angle = raw_angle[0..2].parse::<f64>().ok()?
            + raw_angle[2..].parse::<f64>().ok()? / 60_000.;

        if &caps["lat_sign"] == "N" {
            angle
        } else {
            -angle
        }
    };

    let longitude = {
        let raw_angle = &caps["lon"];
        let angle = raw_angle[0..3].parse::<f64>().ok()?
            + raw_angle[3..].parse::<f64>().ok()? / 60_000.;

        if &caps["lon_sign"] == "E" {
            angle
        } else {
            -angle
        }
    };

    if latitude.abs() > 90. || longitude.abs() > 180. {
        return None;
    }

    Some(Fix {
        time,
        position: GeoPoint::new(latitude, longitude),
        pressure_altitude: caps["pressure"].parse().ok()?,
        gnss_altitude: caps["gnss"].parse().ok()?,
    })
}
