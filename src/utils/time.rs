use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use mongodb::bson::DateTime as BsonDateTime;

/// Limites de calendário usados pelas estatísticas (horário local do servidor)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalendarBounds {
    pub today: NaiveDate,
    pub today_start: DateTime<Utc>,
    /// Domingo mais recente, 00:00
    pub week_start: DateTime<Utc>,
    pub last_week_start: DateTime<Utc>,
}

impl CalendarBounds {
    pub fn at<Tz: TimeZone>(now: &DateTime<Tz>) -> Self {
        let tz = now.timezone();
        let today = now.date_naive();
        let week_start_date = today - Duration::days(today.weekday().num_days_from_sunday() as i64);
        let week_start = local_midnight(&tz, week_start_date);

        Self {
            today,
            today_start: local_midnight(&tz, today),
            week_start,
            last_week_start: week_start - Duration::days(7),
        }
    }

    /// Data de hoje no formato usado em `dueDate`
    pub fn today_str(&self) -> String {
        self.today.format("%Y-%m-%d").to_string()
    }
}

/// Meia-noite local de `date`, como instante UTC.
pub fn local_midnight<Tz: TimeZone>(tz: &Tz, date: NaiveDate) -> DateTime<Utc> {
    let naive = date.and_time(NaiveTime::MIN);
    tz.from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|| Utc.from_utc_datetime(&naive))
}

pub fn bson_to_utc(ts: BsonDateTime) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(ts.timestamp_millis())
        .single()
        .unwrap_or_default()
}

pub fn utc_to_bson(dt: DateTime<Utc>) -> BsonDateTime {
    BsonDateTime::from_millis(dt.timestamp_millis())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;

    #[test]
    fn test_week_starts_on_sunday() {
        // 2026-10-21 é uma quarta-feira
        let now = Utc.with_ymd_and_hms(2026, 10, 21, 15, 30, 0).unwrap();
        let bounds = CalendarBounds::at(&now);

        assert_eq!(bounds.today_start, Utc.with_ymd_and_hms(2026, 10, 21, 0, 0, 0).unwrap());
        assert_eq!(bounds.week_start, Utc.with_ymd_and_hms(2026, 10, 18, 0, 0, 0).unwrap());
        assert_eq!(bounds.last_week_start, Utc.with_ymd_and_hms(2026, 10, 11, 0, 0, 0).unwrap());
        assert_eq!(bounds.today_str(), "2026-10-21");
    }

    #[test]
    fn test_sunday_is_its_own_week_start() {
        let now = Utc.with_ymd_and_hms(2026, 10, 18, 8, 0, 0).unwrap();
        let bounds = CalendarBounds::at(&now);
        assert_eq!(bounds.week_start, bounds.today_start);
    }

    #[test]
    fn test_bounds_use_local_midnight() {
        let tz = FixedOffset::west_opt(3 * 3600).unwrap();
        let now = tz.with_ymd_and_hms(2026, 10, 21, 1, 0, 0).unwrap();
        let bounds = CalendarBounds::at(&now);

        // 00:00 em UTC-3 = 03:00 UTC
        assert_eq!(bounds.today_start, Utc.with_ymd_and_hms(2026, 10, 21, 3, 0, 0).unwrap());
        assert_eq!(bounds.today_str(), "2026-10-21");
    }

    #[test]
    fn test_bson_conversion_keeps_millis() {
        let dt = Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();
        assert_eq!(bson_to_utc(utc_to_bson(dt)), dt);
    }
}
