use crate::models::{CalendarResponse, DayCell, Habit, HabitView};
use crate::streak;
use chrono::{Duration, NaiveDate};

pub const DEFAULT_CALENDAR_DAYS: u32 = 7;
pub const MAX_CALENDAR_DAYS: u32 = 366;

pub fn habit_view(habit: &Habit, today: NaiveDate) -> HabitView {
    HabitView {
        id: habit.id.clone(),
        name: habit.name.clone(),
        created_at: habit.created_at,
        order: habit.order,
        last_completed: habit.last_completed,
        is_completed_today: streak::is_completed_on(habit, today, today),
        current_streak: streak::current_streak(habit, today),
    }
}

/// Day cells for the `days` days ending at `today`, oldest first. Only today
/// can be completed from the calendar.
pub fn build_calendar_at(habit: &Habit, today: NaiveDate, days: u32) -> CalendarResponse {
    let days = days.clamp(1, MAX_CALENDAR_DAYS);
    let mut cells = Vec::with_capacity(days as usize);
    for offset in (0..days).rev() {
        let date = today - Duration::days(i64::from(offset));
        cells.push(DayCell {
            date,
            completed: streak::is_completed_on(habit, date, today),
            editable: date == today,
        });
    }

    CalendarResponse {
        habit_id: habit.id.clone(),
        days: cells,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn calendar_covers_each_day_ending_today() {
        let today = day(2026, 1, 5);
        let mut habit = Habit::new("Read".to_string(), Utc::now());
        streak::record_completion(&mut habit, today - Duration::days(2), today).unwrap();

        let calendar = build_calendar_at(&habit, today, DEFAULT_CALENDAR_DAYS);
        assert_eq!(calendar.days.len(), 7);
        assert_eq!(calendar.days[0].date, day(2025, 12, 30));
        assert_eq!(calendar.days[6].date, today);

        let completed: Vec<NaiveDate> = calendar
            .days
            .iter()
            .filter(|cell| cell.completed)
            .map(|cell| cell.date)
            .collect();
        assert_eq!(completed, [day(2026, 1, 3)]);
        assert_eq!(calendar.days.iter().filter(|cell| cell.editable).count(), 1);
        assert!(calendar.days[6].editable);
    }

    #[test]
    fn calendar_length_is_clamped() {
        let habit = Habit::new("Read".to_string(), Utc::now());
        let today = day(2026, 1, 5);
        assert_eq!(build_calendar_at(&habit, today, 0).days.len(), 1);
        assert_eq!(build_calendar_at(&habit, today, 10_000).days.len(), 366);
    }

    #[test]
    fn view_reports_today_and_streak() {
        let today = day(2024, 1, 3);
        let mut habit = Habit::new("Walk".to_string(), Utc::now());
        for d in 1..=3 {
            streak::record_completion(&mut habit, day(2024, 1, d), today).unwrap();
        }

        let view = habit_view(&habit, today);
        assert!(view.is_completed_today);
        assert_eq!(view.current_streak, 3);

        let tomorrow = habit_view(&habit, day(2024, 1, 4));
        assert!(!tomorrow.is_completed_today);
        assert_eq!(tomorrow.current_streak, 0);
    }
}
