mod crash_tail;
mod helpers;
mod scenarios;
