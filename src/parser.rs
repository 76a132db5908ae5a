/*
    Insert(rideNumber, rideCost, tripDuration) : Queue a new ride.
    Print(rideNumber) : Print the ride as (rideNumber,rideCost,tripDuration).
    Print(rideNumber1, rideNumber2) : Print every ride with rideNumber1 <= rideNumber <= rideNumber2.
    GetNextRide() : Dispatch and print the cheapest ride, shortest trip first on equal cost.
    CancelRide(rideNumber) : Drop the ride if it is pending.
    UpdateTrip(rideNumber, newTripDuration) : Change a pending ride's trip duration.
 */

use nom::{
    branch::alt,
    bytes::complete::tag,
    character::complete::{char, i64 as signed, multispace0, not_line_ending},
    combinator::{eof, map},
    sequence::{delimited, preceded, tuple},
    IResult,
};

use crate::ride::{Cost, RideId, TripDuration};

#[derive(Debug, PartialEq)]
pub enum RideCommand<'a> {
    Insert(RideId, Cost, TripDuration),
    Print(RideId),
    PrintRange(RideId, RideId),
    GetNextRide,
    CancelRide(RideId),
    UpdateTrip(RideId, TripDuration),
    Unknown(&'a str),
}

pub fn parse_command(input: &str) -> IResult<&str, RideCommand> {
    alt((
        parse_insert_command,
        parse_print_range_command,
        parse_print_command,
        parse_next_ride_command,
        parse_cancel_command,
        parse_update_command,
        parse_unknown_command,
    ))(input)
}

fn parse_insert_command(input: &str) -> IResult<&str, RideCommand> {
    let (input, _) = parse_keyword("Insert")(input)?;
    let (input, (ride_id, cost, duration)) =
        parse_args(tuple((parse_number, parse_next_number, parse_next_number)))(input)?;
    Ok((input, RideCommand::Insert(ride_id, cost, duration)))
}

fn parse_print_range_command(input: &str) -> IResult<&str, RideCommand> {
    let (input, _) = parse_keyword("Print")(input)?;
    let (input, (low, high)) = parse_args(tuple((parse_number, parse_next_number)))(input)?;
    Ok((input, RideCommand::PrintRange(low, high)))
}

fn parse_print_command(input: &str) -> IResult<&str, RideCommand> {
    let (input, _) = parse_keyword("Print")(input)?;
    let (input, ride_id) = parse_args(parse_number)(input)?;
    Ok((input, RideCommand::Print(ride_id)))
}

fn parse_next_ride_command(input: &str) -> IResult<&str, RideCommand> {
    let (input, _) = parse_keyword("GetNextRide")(input)?;
    let (input, _) = parse_args(multispace0)(input)?;
    Ok((input, RideCommand::GetNextRide))
}

fn parse_cancel_command(input: &str) -> IResult<&str, RideCommand> {
    let (input, _) = parse_keyword("CancelRide")(input)?;
    let (input, ride_id) = parse_args(parse_number)(input)?;
    Ok((input, RideCommand::CancelRide(ride_id)))
}

fn parse_update_command(input: &str) -> IResult<&str, RideCommand> {
    let (input, _) = parse_keyword("UpdateTrip")(input)?;
    let (input, (ride_id, duration)) = parse_args(tuple((parse_number, parse_next_number)))(input)?;
    Ok((input, RideCommand::UpdateTrip(ride_id, duration)))
}

fn parse_unknown_command(input: &str) -> IResult<&str, RideCommand> {
    let (input, line) = preceded(multispace0, not_line_ending)(input)?;
    Ok((input, RideCommand::Unknown(line.trim_end())))
}

fn parse_keyword<'a>(keyword: &'static str) -> impl FnMut(&'a str) -> IResult<&'a str, &'a str> {
    preceded(multispace0, tag(keyword))
}

/// Parenthesized argument list, followed only by whitespace up to the end of
/// the line.
fn parse_args<'a, O, F>(args: F) -> impl FnMut(&'a str) -> IResult<&'a str, O>
where
    F: FnMut(&'a str) -> IResult<&'a str, O>,
{
    map(
        tuple((
            delimited(
                preceded(multispace0, char('(')),
                args,
                preceded(multispace0, char(')')),
            ),
            multispace0,
            eof,
        )),
        |(parsed, _, _)| parsed,
    )
}

fn parse_number(input: &str) -> IResult<&str, i64> {
    preceded(multispace0, signed)(input)
}

fn parse_next_number(input: &str) -> IResult<&str, i64> {
    preceded(preceded(multispace0, char(',')), parse_number)(input)
}
